use tracing::{info, warn};

use crate::credential::CredentialHasher;
use crate::db::connector::{Connector, SqliteConnector};
use crate::db::models::{DbUser, NewTeacher, NewUser, Role};
use crate::db::scope::ConnectionScope;
use crate::db::stores::{ClassStore, TeacherStore, UserStore};
use crate::error::{DeskError, StepContext};

/// Input for [`AccountService::create_teacher`].
#[derive(Debug, Clone)]
pub struct NewTeacherAccount {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub employee_no: String,
    pub class_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherAccount {
    pub user_id: i64,
    pub teacher_id: i64,
}

/// Account operations spanning several tables; each write path runs as one unit of work.
pub struct AccountService<C: Connector = SqliteConnector> {
    scope: ConnectionScope<C>,
    users: UserStore<C>,
    classes: ClassStore<C>,
    teachers: TeacherStore<C>,
    hasher: CredentialHasher,
}

impl<C: Connector> AccountService<C> {
    pub fn new(scope: ConnectionScope<C>, hasher: CredentialHasher) -> Self {
        Self {
            users: UserStore::new(scope.clone()),
            classes: ClassStore::new(scope.clone()),
            teachers: TeacherStore::new(scope.clone()),
            scope,
            hasher,
        }
    }

    /// Create a login and its teacher profile atomically.
    ///
    /// The class is checked before any transaction is opened. If it disappears
    /// in between, the profile insert fails on the foreign key and the user row
    /// is rolled back with it.
    pub async fn create_teacher(&self, new: NewTeacherAccount) -> Result<TeacherAccount, DeskError> {
        if !self.classes.exists(new.class_id).await? {
            return Err(DeskError::NotFound {
                entity: "class",
                id: new.class_id,
            });
        }

        let user = NewUser {
            username: new.username,
            password: self.hash(&new.password).await?,
            role: Role::Teacher,
        };
        let (users, teachers) = (&self.users, &self.teachers);

        let account = self
            .scope
            .unit_of_work(move || async move {
                let user_id = users.insert(&user).await.step("insert user")?;
                let teacher_id = teachers
                    .insert(&NewTeacher {
                        user_id,
                        class_id: new.class_id,
                        full_name: new.full_name,
                        employee_no: new.employee_no,
                    })
                    .await
                    .step("insert teacher profile")?;
                Ok::<_, DeskError>(TeacherAccount {
                    user_id,
                    teacher_id,
                })
            })
            .await?;

        info!(
            user_id = account.user_id,
            teacher_id = account.teacher_id,
            "teacher account created"
        );
        Ok(account)
    }

    /// Delete a teacher profile and its login together.
    pub async fn remove_teacher(&self, user_id: i64) -> Result<(), DeskError> {
        let (users, teachers) = (&self.users, &self.teachers);
        self.scope
            .unit_of_work(move || async move {
                if !teachers
                    .delete_by_user_id(user_id)
                    .await
                    .step("delete teacher profile")?
                {
                    return Err(DeskError::NotFound {
                        entity: "teacher",
                        id: user_id,
                    });
                }
                users.delete(user_id).await.step("delete user")?;
                Ok::<_, DeskError>(())
            })
            .await
    }

    /// Check a username/password pair.
    ///
    /// A successful login against a legacy plaintext or outdated record
    /// replaces it with a fresh hash.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<DbUser, DeskError> {
        let Some(mut user) = self.users.find_by_username(username).await? else {
            let (hasher, password) = (self.hasher, password.to_owned());
            tokio::task::spawn_blocking(move || hasher.dummy_verify(&password)).await?;
            return Err(DeskError::InvalidCredentials);
        };

        if !self.verify(password, &user.password).await? {
            return Err(DeskError::InvalidCredentials);
        }

        if self.hasher.needs_rehash(&user.password)? {
            let record = self.hash(password).await?;
            match self.users.update_password(user.id, &record).await {
                Ok(()) => {
                    info!(user_id = user.id, "credential record upgraded");
                    user.password = record;
                }
                Err(e) => warn!(user_id = user.id, error = %e, "credential upgrade failed"),
            }
        }

        Ok(user)
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current: &str,
        new_password: &str,
    ) -> Result<(), DeskError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(DeskError::NotFound {
                entity: "user",
                id: user_id,
            })?;

        if !self.verify(current, &user.password).await? {
            return Err(DeskError::InvalidCredentials);
        }

        let record = self.hash(new_password).await?;
        self.users.update_password(user_id, &record).await
    }

    /// Create the administrator account if no user with that name exists yet.
    /// Returns the user id either way.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<i64, DeskError> {
        if let Some(existing) = self.users.find_by_username(username).await? {
            return Ok(existing.id);
        }
        let id = self
            .users
            .insert(&NewUser {
                username: username.to_string(),
                password: self.hash(password).await?,
                role: Role::Admin,
            })
            .await?;
        info!(user_id = id, username, "administrator account created");
        Ok(id)
    }

    // PBKDF2 is CPU-bound; keep it off the async workers.
    async fn hash(&self, plaintext: &str) -> Result<String, DeskError> {
        let (hasher, plaintext) = (self.hasher, plaintext.to_owned());
        Ok(tokio::task::spawn_blocking(move || hasher.hash(&plaintext).to_string()).await?)
    }

    async fn verify(&self, plaintext: &str, stored: &str) -> Result<bool, DeskError> {
        let (hasher, plaintext, stored) = (self.hasher, plaintext.to_owned(), stored.to_owned());
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored)).await?
    }
}

use crate::domain::user::driving_ports::{CreateUserError, LoginError};
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use thiserror::Error;
use tracing::{error, info};

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct NuraUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
}

/// A user together with the password hash their login attempts are checked against
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user: NuraUser,
    pub password_hash: String,
}

#[cfg_attr(test, derive(Clone, Debug))]
pub struct CreateUser {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

/// Minimum accepted password length for new accounts
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Salted password hashing. Hashes are Argon2id PHC strings, so the salt and parameters travel
/// with the hash and plaintext passwords are never stored.
pub mod password {
    use anyhow::{Context, anyhow};
    use argon2::Argon2;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

    pub fn hash_password(password: &str) -> Result<String, anyhow::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash password: {err}"))?;

        Ok(hash.to_string())
    }

    /// Returns `Ok(false)` for a wrong password and an error only when the stored hash is unusable
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, anyhow::Error> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|err| anyhow!("stored password hash is malformed: {err}"))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(anyhow!("failed to verify password: {err}")),
        }
    }

    /// [hash_password] on tokio's blocking pool, keeping Argon2 off the async workers
    pub async fn hash(password: &str) -> Result<String, anyhow::Error> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .context("password hashing task failed")?
    }

    /// [verify_password] on tokio's blocking pool
    pub async fn verify(password: &str, hash: &str) -> Result<bool, anyhow::Error> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .context("password verification task failed")?
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn hashing_runs_off_the_async_workers() {
            let hashed = hash("admin123").await.expect("hashing should succeed");

            assert!(verify("admin123", &hashed).await.expect("verify should succeed"));
            assert!(!verify("admin321", &hashed).await.expect("verify should succeed"));
        }

        #[test]
        fn hashes_are_salted_argon2id() {
            let first = hash_password("admin123").expect("hashing should succeed");
            let second = hash_password("admin123").expect("hashing should succeed");

            assert!(first.starts_with("$argon2id$"));
            assert_ne!(first, second);
        }

        #[test]
        fn verifies_only_the_right_password() {
            let hash = hash_password("admin123").expect("hashing should succeed");

            assert!(verify_password("admin123", &hash).expect("verify should succeed"));
            assert!(!verify_password("admin124", &hash).expect("verify should succeed"));
        }

        #[test]
        fn rejects_plaintext_in_place_of_a_hash() {
            assert!(verify_password("admin123", "admin123").is_err());
        }
    }
}

pub mod driven_ports {
    use super::*;

    pub trait CredentialReader: Sync {
        /// Finds every user whose username or email equals `login`
        async fn credentials_for_login(
            &self,
            login: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<StoredCredentials>, anyhow::Error>;
    }

    /// A user row ready to be written, with the password already hashed
    pub struct NewUserRecord<'data> {
        pub username: &'data str,
        pub email: Option<&'data str>,
        pub password_hash: &'data str,
    }

    pub trait UserWriter: Sync {
        async fn create_user(
            &self,
            user: &NewUserRecord<'_>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i64, anyhow::Error>;
    }

    pub struct UserDescription<'names> {
        pub username: &'names str,
        pub email: Option<&'names str>,
    }

    pub trait DetectUser: Sync {
        async fn user_exists(
            &self,
            user_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;

        /// True if the username or the email of `description` is already taken
        async fn user_with_login_exists(
            &self,
            description: UserDescription<'_>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    #[derive(Debug, Error)]
    pub enum LoginError {
        #[error("username and password are both required")]
        MissingCredentials,
        #[error("the supplied credentials did not match any user")]
        InvalidCredentials,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    #[derive(Debug, Error)]
    pub enum CreateUserError {
        #[error("The provided username or email is already in use.")]
        UserAlreadyExists,
        #[error("{0}")]
        Invalid(String),
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }


    pub trait UserPort {
        async fn login(
            &self,
            username: &str,
            password: &str,
            ext_cxn: &mut impl ExternalConnectivity,
            cred_read: &impl driven_ports::CredentialReader,
        ) -> Result<NuraUser, LoginError>;
        async fn create_user(
            &self,
            new_user: &CreateUser,
            ext_cxn: &mut impl ExternalConnectivity,
            u_writer: &impl driven_ports::UserWriter,
            u_detect: &impl driven_ports::DetectUser,
        ) -> Result<i64, CreateUserError>;
    }
}

pub struct UserService {}

#[derive(Debug, Error)]
pub enum UserExistsErr {
    #[error("user with ID {0} does not exist")]
    UserDoesNotExist(i64),

    #[error(transparent)]
    PortError(#[from] anyhow::Error),
}

pub async fn verify_user_exists(
    id: i64,
    external_cxn: &mut impl ExternalConnectivity,
    user_detect: &impl driven_ports::DetectUser,
) -> Result<(), UserExistsErr> {
    let does_user_exist = user_detect.user_exists(id, external_cxn).await?;

    if does_user_exist {
        Ok(())
    } else {
        Err(UserExistsErr::UserDoesNotExist(id))
    }
}

impl driving_ports::UserPort for UserService {
    async fn login(
        &self,
        username: &str,
        password: &str,
        ext_cxn: &mut impl ExternalConnectivity,
        cred_read: &impl driven_ports::CredentialReader,
    ) -> Result<NuraUser, LoginError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let candidates = cred_read
            .credentials_for_login(username, ext_cxn)
            .await
            .context("looking up credentials during login")?;

        for candidate in candidates {
            if password::verify(password, &candidate.password_hash)
                .await
                .with_context(|| format!("checking the password of user {}", candidate.user.id))?
            {
                info!(user_id = candidate.user.id, "Login succeeded");
                return Ok(candidate.user);
            }
        }

        Err(LoginError::InvalidCredentials)
    }

    async fn create_user(
        &self,
        new_user: &CreateUser,
        ext_cxn: &mut impl ExternalConnectivity,
        u_writer: &impl driven_ports::UserWriter,
        u_detect: &impl driven_ports::DetectUser,
    ) -> Result<i64, CreateUserError> {
        let username = new_user.username.trim();
        if username.is_empty() {
            return Err(CreateUserError::Invalid("a username is required".into()));
        }
        if new_user.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CreateUserError::Invalid(format!(
                "passwords must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }
        let email = new_user
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty());

        let description = driven_ports::UserDescription { username, email };
        let user_exists = u_detect
            .user_with_login_exists(description, &mut *ext_cxn)
            .await
            .context("Looking up user during creation")?;
        if user_exists {
            return Err(CreateUserError::UserAlreadyExists);
        }

        let password_hash = password::hash(&new_user.password).await?;
        let record = driven_ports::NewUserRecord {
            username,
            email,
            password_hash: &password_hash,
        };

        let created = u_writer.create_user(&record, &mut *ext_cxn).await;
        if let Err(ref port_err) = created {
            error!("User create failure: {port_err}");
        }

        Ok(created.context("Trying to create user at service level")?)
    }
}

#[cfg(test)]
mod verify_user_exists_tests {
    use super::*;
    use crate::domain::test_util::Connectivity;
    use crate::external_connections;
    use speculoos::prelude::*;
    use std::sync::RwLock;

    #[tokio::test]
    async fn detects_user() {
        let user_stuff = test_util::InMemoryUserPersistence::new_with_users(&[
            test_util::user_create_default(),
        ]);
        let mut db_cxn = external_connections::test_util::FakeExternalConnectivity::new();

        let exists_result = verify_user_exists(1, &mut db_cxn, &RwLock::new(user_stuff)).await;
        assert_that!(exists_result).is_ok();
    }

    #[tokio::test]
    async fn errors_when_user_doesnt_exist() {
        let user_stuff = test_util::InMemoryUserPersistence::new_locked();
        let mut db_cxn = external_connections::test_util::FakeExternalConnectivity::new();

        let exists_result = verify_user_exists(5, &mut db_cxn, &user_stuff).await;
        assert_that!(exists_result)
            .is_err()
            .matches(|inner_err| matches!(inner_err, UserExistsErr::UserDoesNotExist(5)));
    }

    #[tokio::test]
    async fn propagates_port_error() {
        let mut user_persistence = test_util::InMemoryUserPersistence::new();
        user_persistence.connectivity = Connectivity::Disconnected;

        let user_stuff = RwLock::new(user_persistence);
        let mut db_cxn = external_connections::test_util::FakeExternalConnectivity::new();

        let exists_result = verify_user_exists(5, &mut db_cxn, &user_stuff).await;
        assert_that!(exists_result)
            .is_err()
            .matches(|inner_err| matches!(inner_err, UserExistsErr::PortError(_)));
    }
}

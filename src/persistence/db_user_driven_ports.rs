use crate::domain;
use crate::domain::user::driven_ports::{NewUserRecord, UserDescription};
use crate::domain::user::{NuraUser, StoredCredentials};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};

pub struct DbDetectUser;

impl domain::user::driven_ports::DetectUser for DbDetectUser {
    async fn user_exists(
        &self,
        user_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let user_with_id_count = super::count(
            connection
                .borrow_connection()
                .get(
                    "SELECT COUNT(*) AS count FROM users WHERE id = ?",
                    &[user_id.into()],
                )
                .await
                .context("Detecting user with ID")?,
        )?;

        Ok(user_with_id_count > 0)
    }

    async fn user_with_login_exists(
        &self,
        description: UserDescription<'_>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let matching_count = super::count(
            connection
                .borrow_connection()
                .get(
                    "SELECT COUNT(*) AS count FROM users WHERE username = ? OR (email IS NOT NULL AND email = ?)",
                    &[description.username.into(), description.email.into()],
                )
                .await
                .context("Detecting user via username or email")?,
        )?;

        Ok(matching_count > 0)
    }
}

pub struct DbCredentialReader;

impl domain::user::driven_ports::CredentialReader for DbCredentialReader {
    async fn credentials_for_login(
        &self,
        login: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<StoredCredentials>, Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let rows = connection
            .borrow_connection()
            .query(
                "SELECT id, username, email, password_hash FROM users WHERE username = ? OR email = ? ORDER BY id",
                &[login.into(), login.into()],
            )
            .await
            .context("Fetching credentials for login")?;

        rows.iter()
            .map(|row| -> Result<StoredCredentials, Error> {
                Ok(StoredCredentials {
                    user: NuraUser {
                        id: row.i64("id")?,
                        username: row.str("username")?.to_owned(),
                        email: row.opt_str("email")?.map(str::to_owned),
                    },
                    password_hash: row.str("password_hash")?.to_owned(),
                })
            })
            .collect()
    }
}

pub struct DbUserWriter;

impl domain::user::driven_ports::UserWriter for DbUserWriter {
    async fn create_user(
        &self,
        user: &NewUserRecord<'_>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i64, Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let outcome = connection
            .borrow_connection()
            .run(
                "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)",
                &[
                    user.username.into(),
                    user.email.into(),
                    user.password_hash.into(),
                ],
            )
            .await
            .context("Inserting a new user")?;

        outcome
            .inserted_id
            .context("the database did not report the new user's ID")
    }
}

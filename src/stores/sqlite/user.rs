//! Implements a SQLite backed authentication provider.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use crate::{
    Error,
    auth::{AuthProvider, Email, PasswordHash, Session, ValidatedPassword},
    db::get_uuid,
    stores::sqlite::SQLiteDatabase,
    user::UserId,
};

/// Stores users with bcrypt password hashes and remembers the signed in user.
#[derive(Debug, Clone)]
pub struct SQLiteAuthProvider {
    database: SQLiteDatabase,
    cost: u32,
}

impl SQLiteAuthProvider {
    /// Create a new provider that hashes new passwords with `cost`.
    ///
    /// See [PasswordHash::new] for what `cost` means.
    pub fn new(database: SQLiteDatabase, cost: u32) -> Self {
        Self { database, cost }
    }
}

#[async_trait]
impl AuthProvider for SQLiteAuthProvider {
    async fn log_in(&self, email: &Email, password: &str) -> Result<Session, Error> {
        let credentials = {
            let connection = self.database.lock()?;
            get_credentials(email, &connection)?
        };

        let Some((user_id, password_hash)) = credentials else {
            tracing::debug!("Log in failed, no account for {email}");
            return Err(Error::InvalidCredentials);
        };

        if !password_hash.verify(password)? {
            tracing::debug!("Log in failed, wrong password for {email}");
            return Err(Error::InvalidCredentials);
        }

        set_session(user_id, &*self.database.lock()?)?;
        tracing::info!("User {user_id} logged in");

        Ok(Session {
            user_id,
            email: email.clone(),
        })
    }

    async fn sign_up(&self, email: &Email, password: &ValidatedPassword) -> Result<Session, Error> {
        let password_hash = PasswordHash::new(password, self.cost)?;
        let user_id = UserId::generate();

        {
            let connection = self.database.lock()?;
            let tx = connection.unchecked_transaction()?;

            tx.execute(
                "INSERT INTO user (id, email, password) VALUES (?1, ?2, ?3)",
                (
                    user_id.to_string(),
                    email.as_ref(),
                    password_hash.to_string(),
                ),
            )?;
            set_session(user_id, &tx)?;

            tx.commit()?;
        }

        tracing::info!("Created user {user_id}");

        Ok(Session {
            user_id,
            email: email.clone(),
        })
    }

    async fn log_out(&self) -> Result<(), Error> {
        let connection = self.database.lock()?;
        connection.execute("DELETE FROM session", ())?;

        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, Error> {
        let connection = self.database.lock()?;

        connection
            .query_row(
                "SELECT user.id, user.email FROM session
                 INNER JOIN user ON user.id = session.user_id
                 WHERE session.id = 1",
                (),
                |row| {
                    let raw_email: String = row.get(1)?;

                    Ok(Session {
                        user_id: UserId::new(get_uuid(row, 0)?),
                        email: Email::new_unchecked(&raw_email),
                    })
                },
            )
            .optional()
            .map_err(|error| error.into())
    }
}

fn get_credentials(
    email: &Email,
    connection: &Connection,
) -> Result<Option<(UserId, PasswordHash)>, Error> {
    connection
        .query_row(
            "SELECT id, password FROM user WHERE email = :email",
            &[(":email", &email.to_string())],
            |row| {
                let raw_hash: String = row.get(1)?;

                Ok((
                    UserId::new(get_uuid(row, 0)?),
                    PasswordHash::new_unchecked(&raw_hash),
                ))
            },
        )
        .optional()
        .map_err(|error| error.into())
}

fn set_session(user_id: UserId, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO session (id, user_id) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET user_id = excluded.user_id",
        [user_id.to_string()],
    )?;

    Ok(())
}

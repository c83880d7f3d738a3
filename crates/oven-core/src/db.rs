//! Database connection check
//!
//! Validates the supplied credentials by opening (and immediately closing)
//! a real MySQL connection.

use crate::error::{InstallError, Result};
use crate::request::InstallRequest;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Connection};

/// Try the datasource credentials from the request. Password may be empty;
/// host, database, and username are required.
pub async fn check_connection(req: &InstallRequest) -> Result<String> {
    let host = required(&req.host, "Missing database host")?;
    let database = required(&req.database, "Missing database name")?;
    let username = required(&req.username, "Missing database username")?;

    let mut options = MySqlConnectOptions::new()
        .host(host)
        .database(database)
        .username(username);

    if let Some(password) = req.password.as_deref().filter(|p| !p.is_empty()) {
        options = options.password(password);
    }

    match options.connect().await {
        Ok(mut connection) => {
            let _ = connection.close().await;
            Ok("Successfully connected to the database.".to_string())
        }
        Err(err) => Err(InstallError::Database(err.to_string())),
    }
}

fn required<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| InstallError::Database(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_host() {
        let req = InstallRequest {
            database: Some("app".to_string()),
            username: Some("root".to_string()),
            ..InstallRequest::default()
        };

        let err = check_connection(&req).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing database host");
    }

    #[tokio::test]
    async fn test_empty_database_name() {
        let req = InstallRequest {
            host: Some("localhost".to_string()),
            database: Some(String::new()),
            username: Some("root".to_string()),
            ..InstallRequest::default()
        };

        let err = check_connection(&req).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing database name");
    }

    #[tokio::test]
    async fn test_missing_username() {
        let req = InstallRequest {
            host: Some("localhost".to_string()),
            database: Some("app".to_string()),
            ..InstallRequest::default()
        };

        let err = check_connection(&req).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing database username");
    }
}

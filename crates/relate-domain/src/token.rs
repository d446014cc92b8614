use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Query parameter carrying a launch token on an app URL.
pub const LAUNCH_TOKEN_PARAMETER: &str = "_appLaunchToken";

/// Claims bound into a short-lived app launch token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppLaunchToken {
    pub access_token: String,
    pub environment_id: String,
    pub app_id: String,
    pub dbms_id: String,
    pub principal: String,
}

impl AppLaunchToken {
    /// Every claim is required and must be non-blank.
    pub fn validate(&self) -> RegistryResult<()> {
        let fields = [
            ("accessToken", &self.access_token),
            ("environmentId", &self.environment_id),
            ("appId", &self.app_id),
            ("dbmsId", &self.dbms_id),
            ("principal", &self.principal),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(RegistryError::validation_failure(format!(
                    "App Launch Token field \"{field}\" must not be empty"
                )));
            }
        }
        Ok(())
    }
}

#[must_use]
pub fn app_launch_url(app_root: &str, launch_token: Option<&str>) -> String {
    match launch_token {
        Some(token) if !token.is_empty() => {
            format!("{app_root}?{LAUNCH_TOKEN_PARAMETER}={token}")
        }
        _ => app_root.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> AppLaunchToken {
        AppLaunchToken {
            access_token: "secret".into(),
            environment_id: "default".into(),
            app_id: "browser".into(),
            dbms_id: "abc".into(),
            principal: "neo4j".into(),
        }
    }

    #[test]
    fn serializes_camel_case_claims() {
        let value = serde_json::to_value(token()).expect("serialize");
        assert_eq!(value["environmentId"], "default");
        assert_eq!(value["accessToken"], "secret");
    }

    #[test]
    fn blank_claims_fail_validation() {
        assert!(token().validate().is_ok());
        let mut bad = token();
        bad.principal = " ".into();
        let err = bad.validate().expect_err("blank principal");
        assert_eq!(err.kind(), crate::ErrorKind::ValidationFailure);
    }

    #[test]
    fn launch_url_appends_token_only_when_present() {
        assert_eq!(app_launch_url("http://app", None), "http://app");
        assert_eq!(
            app_launch_url("http://app", Some("t0k")),
            "http://app?_appLaunchToken=t0k"
        );
    }
}

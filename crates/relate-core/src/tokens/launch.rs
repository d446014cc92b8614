use std::sync::Arc;

use relate_domain::{AppLaunchToken, RegistryError, RegistryResult};
use serde_json::Value;
use time::Duration;
use tracing::{debug, warn};

use super::signer::{Hs256Signer, TokenSigner};

const LAUNCH_TOKEN_SALT: &str = "relate-app-launch-token";
pub const LAUNCH_TOKEN_TTL: Duration = Duration::hours(24);

/// Issues and verifies short-lived app launch tokens, keyed per application.
#[derive(Clone)]
pub struct AppLaunchTokenService {
    signer: Arc<dyn TokenSigner>,
}

impl std::fmt::Debug for AppLaunchTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppLaunchTokenService")
            .finish_non_exhaustive()
    }
}

impl Default for AppLaunchTokenService {
    fn default() -> Self {
        Self::new(Arc::new(Hs256Signer::new(LAUNCH_TOKEN_TTL)))
    }
}

fn app_secret(app_id: &str) -> String {
    format!("{LAUNCH_TOKEN_SALT}-{app_id}")
}

impl AppLaunchTokenService {
    pub fn new(signer: Arc<dyn TokenSigner>) -> Self {
        Self { signer }
    }

    pub fn create(&self, token: &AppLaunchToken) -> RegistryResult<String> {
        token.validate()?;
        let Ok(Value::Object(claims)) = serde_json::to_value(token) else {
            return Err(RegistryError::invalid_argument(
                "App Launch Token claims must encode as an object",
            ));
        };
        self.signer
            .sign(claims, app_secret(&token.app_id).as_bytes())
            .map_err(|err| {
                RegistryError::invalid_argument(format!(
                    "failed to sign App Launch Token: {err:#}"
                ))
            })
    }

    /// Verifies `launch_token` with the secret of `app_id` and rebuilds its claims.
    pub fn parse(&self, app_id: &str, launch_token: &str) -> RegistryResult<AppLaunchToken> {
        let claims = self
            .signer
            .verify(launch_token, app_secret(app_id).as_bytes())
            .map_err(|err| {
                debug!(app = %app_id, %err, "launch token rejected");
                RegistryError::validation_failure("Failed to decode App Launch Token")
            })?;
        if claims.get("appId").and_then(Value::as_str) != Some(app_id) {
            warn!(app = %app_id, "launch token issued for another app");
            return Err(RegistryError::validation_failure("App Launch Token mismatch"));
        }
        let token: AppLaunchToken = serde_json::from_value(Value::Object(claims))
            .map_err(|_| RegistryError::validation_failure("Invalid App Launch Token"))?;
        token.validate()?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relate_domain::ErrorKind;
    use serde_json::json;

    use crate::tokens::signer::Claims;

    fn token(app_id: &str) -> AppLaunchToken {
        AppLaunchToken {
            access_token: "opaque".into(),
            environment_id: "default".into(),
            app_id: app_id.into(),
            dbms_id: "1234".into(),
            principal: "neo4j".into(),
        }
    }

    #[test]
    fn round_trips_claims() {
        let service = AppLaunchTokenService::default();
        let signed = service.create(&token("browser")).expect("create");
        assert_eq!(
            service.parse("browser", &signed).expect("parse"),
            token("browser")
        );
    }

    #[test]
    fn other_app_cannot_parse() {
        let service = AppLaunchTokenService::default();
        let signed = service.create(&token("browser")).expect("create");
        let err = service.parse("bloom", &signed).expect_err("other app");
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn blank_claims_are_refused_both_ways() {
        let service = AppLaunchTokenService::default();
        let mut blank = token("browser");
        blank.principal = " ".into();
        assert_eq!(
            service.create(&blank).expect_err("blank").kind(),
            ErrorKind::ValidationFailure
        );

        let signer = Hs256Signer::new(LAUNCH_TOKEN_TTL);
        let mut claims = Claims::new();
        claims.insert("appId".into(), json!("browser"));
        let partial = signer
            .sign(claims, app_secret("browser").as_bytes())
            .expect("sign");
        assert_eq!(
            service
                .parse("browser", &partial)
                .expect_err("partial")
                .kind(),
            ErrorKind::ValidationFailure
        );
    }
}

//! Login and registration flows
//!
//! Both flows validate locally first (no network on a validation failure),
//! keep the submitted form on failure so it can be corrected, and surface the
//! provider's detail message inline.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::ControlPlane;
use crate::error::{ConsoleError, Result};
use crate::models::Registration;
use crate::navigator::{Navigator, Route};
use crate::probe::PlatformStatusProbe;
use crate::session::SessionStore;

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

fn required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConsoleError::validation(field, "Required"));
    }
    Ok(())
}

/// Sign-in form
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(ConsoleError::validation("username", "Username is required"));
        }
        if self.password.is_empty() {
            return Err(ConsoleError::validation("password", "Password is required"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Sign-up form
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<()> {
        required("username", &self.username)?;
        if self.username.trim().chars().count() < MIN_USERNAME_LEN {
            return Err(ConsoleError::validation("username", "Min 3 chars"));
        }

        required("email", &self.email)?;
        if !EMAIL_PATTERN.is_match(self.email.trim()) {
            return Err(ConsoleError::validation("email", "Invalid email"));
        }

        required("password", &self.password)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ConsoleError::validation("password", "Min 8 chars"));
        }

        required("confirm_password", &self.confirm_password)?;
        if self.confirm_password != self.password {
            return Err(ConsoleError::validation("confirm_password", "Passwords don't match"));
        }

        Ok(())
    }

    fn to_registration(&self) -> Registration {
        Registration {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

impl std::fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Sign-in screen
pub struct LoginFlow {
    api: Arc<dyn ControlPlane>,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    form: LoginForm,
    error: Option<String>,
    just_registered: bool,
}

impl LoginFlow {
    pub fn new(
        api: Arc<dyn ControlPlane>,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            session,
            navigator,
            form: LoginForm::default(),
            error: None,
            just_registered: false,
        }
    }

    /// Open the screen for a specific route (shows the post-registration notice)
    pub fn for_route(mut self, route: &Route) -> Self {
        self.just_registered = matches!(route, Route::Login { just_registered: true });
        self
    }

    pub fn form(&self) -> &LoginForm {
        &self.form
    }

    /// Inline error of the last submit
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn just_registered(&self) -> bool {
        self.just_registered
    }

    /// Login → identity → session → dashboard
    pub async fn submit(&mut self, form: LoginForm) -> Result<()> {
        self.form = form;
        self.error = None;

        if let Err(e) = self.form.validate() {
            self.error = Some(e.inline_message());
            return Err(e);
        }

        match self.authenticate().await {
            Ok(()) => {
                self.navigator.navigate(Route::Dashboard.into());
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.inline_message());
                Err(e)
            }
        }
    }

    async fn authenticate(&self) -> Result<()> {
        let username = self.form.username.trim();

        let token = self
            .api
            .login(username, &self.form.password)
            .await
            .map_err(|e| {
                warn!(username, "Login rejected: {}", e);
                ConsoleError::AuthenticationFailure(e.detail_or(LOGIN_FAILED))
            })?;

        let me = self
            .api
            .identity(&token.access_token)
            .await
            .map_err(|e| {
                warn!(username, "Identity lookup failed: {}", e);
                ConsoleError::AuthenticationFailure(e.detail_or(LOGIN_FAILED))
            })?;

        self.session
            .set_auth(&token.access_token, &me.username, me.is_superuser)
            .map_err(|_| ConsoleError::AuthenticationFailure(LOGIN_FAILED.to_string()))
    }
}

/// Sign-up screen
pub struct RegistrationFlow {
    api: Arc<dyn ControlPlane>,
    navigator: Arc<dyn Navigator>,
    form: RegisterForm,
    error: Option<String>,
    is_first_user: bool,
}

impl RegistrationFlow {
    pub fn new(api: Arc<dyn ControlPlane>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            navigator,
            form: RegisterForm::default(),
            error: None,
            is_first_user: false,
        }
    }

    /// Check whether this registration creates the administrator.
    /// Probe failure leaves the screen in its generic sign-up mode.
    pub async fn detect_first_user(&mut self, probe: &PlatformStatusProbe) -> bool {
        self.is_first_user = probe
            .fetch_platform_status()
            .await
            .map(|status| !status.has_admin)
            .unwrap_or(false);
        self.is_first_user
    }

    pub fn is_first_user(&self) -> bool {
        self.is_first_user
    }

    pub fn form(&self) -> &RegisterForm {
        &self.form
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Register, then hand over to the sign-in screen
    pub async fn submit(&mut self, form: RegisterForm) -> Result<()> {
        self.form = form;
        self.error = None;

        if let Err(e) = self.form.validate() {
            self.error = Some(e.inline_message());
            return Err(e);
        }

        let registration = self.form.to_registration();
        match self.api.register(&registration).await {
            Ok(()) => {
                info!(username = %registration.username, admin = self.is_first_user, "Account registered");
                self.navigator.navigate(
                    Route::Login {
                        just_registered: true,
                    }
                    .into(),
                );
                Ok(())
            }
            Err(e) => {
                warn!(username = %registration.username, "Registration rejected: {}", e);
                let err = ConsoleError::AuthenticationFailure(e.detail_or(REGISTRATION_FAILED));
                self.error = Some(err.inline_message());
                Err(err)
            }
        }
    }
}

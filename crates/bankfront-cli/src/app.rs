use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bankfront_core::api::ApiError;
use bankfront_core::auth::{FileBackend, KeyringBackend};
use bankfront_core::config::SessionBackendKind;
use bankfront_core::models::{NewUser, ProfileUpdate, User};
use bankfront_core::pipeline::NavigateTo;
use bankfront_core::router::{Navigator, LOGIN_ROUTE};
use bankfront_core::{BankClient, Config, RouteTable, Router, SessionStore};
use tracing::{debug, warn};

use crate::cli::{Commands, LoginArgs, ProfileArgs, SignupArgs};

/// Route shown after a successful login
const HOME_ROUTE: &str = "home";

/// Route that owns the profile view
const PROFILE_ROUTE: &str = "profile";

/// Route that owns the signup view
const SIGNUP_ROUTE: &str = "signup";

pub struct App {
    config: Config,
    router: Arc<Router>,
    client: BankClient,
}

impl App {
    pub fn new(config: Config, ephemeral: bool) -> Result<Self> {
        let session = Arc::new(Self::open_session(&config, ephemeral)?);
        let router = Arc::new(Router::new(RouteTable::standard()));
        let client = BankClient::new(
            &config,
            session.clone(),
            Arc::new(NavigateTo::login(router.clone())),
        )?;

        // A persisted session lands on home, like reopening the app while signed in
        if session.is_authenticated() {
            router.navigate(HOME_ROUTE)?;
        }

        Ok(Self {
            config,
            router,
            client,
        })
    }

    fn open_session(config: &Config, ephemeral: bool) -> Result<SessionStore> {
        let kind = if ephemeral {
            SessionBackendKind::Memory
        } else {
            config.session_backend
        };
        debug!(backend = ?kind, "Opening session store");
        match kind {
            SessionBackendKind::File => SessionStore::open(FileBackend::new(config.cache_dir()?)),
            SessionBackendKind::Keyring => SessionStore::open(KeyringBackend::new()),
            SessionBackendKind::Memory => Ok(SessionStore::in_memory()),
        }
    }

    fn session(&self) -> &SessionStore {
        self.client.session()
    }

    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.login(args).await,
            Commands::Signup(args) => self.signup(args).await,
            Commands::Logout => self.logout().await,
            Commands::Profile(args) => self.profile(args).await,
            Commands::Home => self.home().await,
            Commands::Status => {
                self.status();
                Ok(())
            }
            Commands::Routes => {
                self.routes();
                Ok(())
            }
        }
    }

    /// Print what the user needs to know after a command, including the
    /// view they ended up on
    pub fn report(&self, result: &Result<()>) {
        if let Err(e) = result {
            if is_session_expired(e) {
                eprintln!("Your session has expired. Please log in again.");
            }
        }
        let route = self.router.current();
        eprintln!("[{} view at {}]", route.view, route.path);
    }

    // ===== Views =====

    async fn login(&mut self, args: LoginArgs) -> Result<()> {
        self.router.navigate(LOGIN_ROUTE)?;

        let email = match args.email.or_else(|| self.config.last_email.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        println!("\nAuthenticating...");
        self.client.login(&email, &password).await?;

        self.config.last_email = Some(email.trim().to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.router.navigate(HOME_ROUTE)?;
        println!("Login successful!");
        Ok(())
    }

    async fn signup(&mut self, args: SignupArgs) -> Result<()> {
        self.router.navigate(SIGNUP_ROUTE)?;

        let user_type_id = match args.user_type_id {
            Some(id) => id,
            None => self.choose_user_type().await?,
        };
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let user = self
            .client
            .signup(&NewUser {
                first_name: args.first_name,
                last_name: args.last_name,
                address: args.address,
                mobile_number: args.mobile_number,
                email_id: args.email,
                password,
                user_type_id,
            })
            .await?;

        println!("Account created for {}. You can now log in.", user.email_id);
        self.router.navigate(LOGIN_ROUTE)?;
        Ok(())
    }

    async fn choose_user_type(&self) -> Result<i64> {
        let types = self.client.fetch_user_types().await?;
        if types.is_empty() {
            bail!("The server offered no user types to sign up as");
        }
        println!("Account types:");
        for user_type in &types {
            println!("  {:>3}  {}", user_type.id, user_type.user_type);
        }
        let choice = prompt("Type id: ")?;
        let id: i64 = choice.parse().context("Type id must be a number")?;
        if !types.iter().any(|t| t.id == id) {
            bail!("Unknown type id {}", id);
        }
        Ok(id)
    }

    async fn logout(&mut self) -> Result<()> {
        let result = self.client.logout().await;
        self.router.navigate(LOGIN_ROUTE)?;
        result?;
        println!("Logged out.");
        Ok(())
    }

    async fn profile(&mut self, args: ProfileArgs) -> Result<()> {
        self.require_session()?;
        self.router.navigate(PROFILE_ROUTE)?;

        let mut user = self.client.current_user().await?;
        let update = ProfileUpdate {
            first_name: args.first_name,
            last_name: args.last_name,
            address: args.address,
            mobile_number: args.mobile_number,
        };
        if !update.is_empty() {
            user = self.client.update_profile(user.id, &update).await?;
            println!("Profile updated.\n");
        }

        print_profile(&user);
        Ok(())
    }

    async fn home(&mut self) -> Result<()> {
        self.require_session()?;
        self.router.navigate(HOME_ROUTE)?;

        let user = self.client.current_user().await?;
        println!("Welcome, {}!", user.full_name());
        if let Some(since) = self.session().signed_in_at() {
            println!("Signed in since {}", since.format("%Y-%m-%d %H:%M UTC"));
        }
        Ok(())
    }

    fn status(&self) {
        if self.session().is_authenticated() {
            let email = self.session().email().unwrap_or_else(|| "unknown user".to_string());
            println!("AUTHENTICATED as {}", email);
        } else {
            println!("UNAUTHENTICATED");
        }
    }

    fn routes(&self) {
        for route in self.router.table().routes() {
            println!("{:<10} {:<10} {}", route.name, route.path, route.view);
        }
    }

    /// Views behind login send the user to the login view when signed out
    fn require_session(&self) -> Result<()> {
        if self.session().is_authenticated() {
            return Ok(());
        }
        self.router.navigate(LOGIN_ROUTE)?;
        bail!("Not logged in. Run `bankfront login` first.")
    }
}

fn is_session_expired(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .map(ApiError::is_unauthorized)
        .unwrap_or(false)
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_profile(user: &User) {
    println!("Name:    {}", user.full_name());
    println!("Email:   {}", user.email_id);
    println!("Mobile:  {}", user.mobile_number.as_deref().unwrap_or("-"));
    println!("Address: {}", user.address.as_deref().unwrap_or("-"));
}

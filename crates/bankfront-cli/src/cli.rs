use clap::{Args, Parser, Subcommand};

/// Terminal front-end for the bank API.
#[derive(Parser, Debug)]
#[command(name = "bankfront")]
#[command(about = "Log in, sign up and manage your bank profile from the terminal")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Keep the session in memory only for this run
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session credential
    Login(LoginArgs),
    /// Create a new account
    Signup(SignupArgs),
    /// Sign out and wipe the session
    Logout,
    /// Show or edit the signed-in user's profile
    Profile(ProfileArgs),
    /// Show the home view
    Home,
    /// Show whether a session is active
    Status,
    /// List the route table
    Routes,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Email address; defaults to the last one used
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SignupArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub address: String,
    #[arg(long)]
    pub mobile_number: String,
    #[arg(long)]
    pub email: String,
    /// User type id, see the choices printed when omitted
    #[arg(long)]
    pub user_type_id: Option<i64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub mobile_number: Option<String>,
}

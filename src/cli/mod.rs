//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod ask;
pub mod conversations;
pub mod profile;
pub mod settings;


use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::ask::run_ask;
use crate::cli::profile::ProfileUpdate;
use crate::cli::settings::{run_set, run_unset, SettingError};
use crate::core::app::AppContext;
use crate::core::config::Config;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::init_file_logging;

#[derive(Parser)]
#[command(name = "compass")]
#[command(version)]
#[command(about = "A terminal career-guidance chat assistant")]
#[command(
    long_about = "Compass is a full-screen terminal chat assistant for career guidance. \
It keeps a profile of your skills, education and interests, remembers every \
conversation, and sends each question to an OpenAI-compatible API (Groq by default) \
together with your profile and recent history.\n\n\
Authentication:\n\
  Set GROQ_API_KEY in your environment or in a .env file. If it is missing, \
Compass opens a setup screen where you can paste the key.\n\n\
Controls:\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a newline\n\
  Ctrl+N            Start a new conversation\n\
  Ctrl+Up/Down      Switch conversations\n\
  Ctrl+P            Edit your profile\n\
  Ctrl+R            Rename the conversation\n\
  Ctrl+D            Delete the conversation\n\
  PageUp/PageDown   Scroll the transcript\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use instead of the configured one
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Directory holding the profile, conversations and log
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Ask one question and print the reply
    Ask {
        /// The question to ask
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
        /// Start a new conversation instead of continuing the most recent one
        #[arg(long)]
        new: bool,
    },
    /// List conversations, most recent first
    List,
    /// Print a conversation transcript
    Show {
        /// Conversation id or unique prefix
        id: String,
    },
    /// Rename a conversation (an empty title restores the automatic one)
    Rename {
        /// Conversation id or unique prefix
        id: String,
        /// New title
        #[arg(trailing_var_arg = true)]
        title: Vec<String>,
    },
    /// Delete a conversation permanently
    Delete {
        /// Conversation id or unique prefix
        id: String,
    },
    /// Write a conversation transcript to a file
    Export {
        /// Conversation id or unique prefix
        id: String,
        /// Output file
        file: PathBuf,
    },
    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        command: Option<ProfileCommands>,
    },
    /// Set configuration values, or list them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ProfileCommands {
    /// Print the profile (default)
    Show,
    /// Change profile fields; fields not given are kept
    Set {
        /// Comma-separated skills
        #[arg(long)]
        skills: Option<String>,
        /// Education level: student, undergraduate, graduate or professional
        #[arg(long)]
        education: Option<String>,
        /// Field of study
        #[arg(long)]
        field: Option<String>,
        /// Comma-separated interests
        #[arg(long)]
        interests: Option<String>,
    },
    /// Clear every profile field
    Reset,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let command = args.command.unwrap_or(Commands::Chat);
    if let Commands::Set { key, value } = &command {
        return finish_setting(run_set(&Config::get_config_path()?, key.as_deref(), value));
    }
    if let Commands::Unset { key } = &command {
        return finish_setting(run_unset(&Config::get_config_path()?, key));
    }

    let context = AppContext::load(args.data_dir.as_deref(), args.model)?;
    if let Err(err) = init_file_logging(&context.paths.log) {
        eprintln!("⚠️  Logging disabled: {err}");
    }

    match command {
        Commands::Chat => run_chat(&context).await,
        Commands::Ask { prompt, new } => run_ask(&context, &prompt, new).await,
        Commands::List => {
            conversations::list(&mut context.conversation_store());
            Ok(())
        }
        Commands::Show { id } => conversations::show(&mut context.conversation_store(), &id),
        Commands::Rename { id, title } => {
            conversations::rename(&mut context.conversation_store(), &id, &title)
        }
        Commands::Delete { id } => conversations::delete(&mut context.conversation_store(), &id),
        Commands::Export { id, file } => {
            conversations::export(&mut context.conversation_store(), &id, &file)
        }
        Commands::Profile { command } => {
            let store = context.profile_store();
            match command.unwrap_or(ProfileCommands::Show) {
                ProfileCommands::Show => {
                    profile::show(&store);
                    Ok(())
                }
                ProfileCommands::Set {
                    skills,
                    education,
                    field,
                    interests,
                } => profile::set(
                    &store,
                    &ProfileUpdate {
                        skills,
                        education,
                        field,
                        interests,
                    },
                ),
                ProfileCommands::Reset => profile::reset(&store),
            }
        }
        // Handled before the data directory is resolved.
        Commands::Set { .. } | Commands::Unset { .. } => Ok(()),
    }
}

fn finish_setting(result: Result<String, SettingError>) -> Result<(), Box<dyn Error>> {
    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            err.print();
            std::process::exit(err.exit_code());
        }
    }
}

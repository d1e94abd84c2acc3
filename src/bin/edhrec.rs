//! Command line access to edhrec.com commander data.

use clap::{Parser, Subcommand, ValueEnum};
use edhrec::{Budget, Edhrec, Timeframe};
use futures::{pin_mut, TryStreamExt};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edhrec")]
#[command(about = "Query commander data from edhrec.com")]
struct Args {
    /// Session state cookie (`userState=...` or just its value)
    #[arg(long, env = "EDHREC_COOKIES")]
    cookies: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current build id
    BuildId,

    /// Print the data of a commander's page
    Commander { name: String },

    /// Print a commander's average deck
    AverageDeck {
        name: String,
        #[arg(short, long)]
        budget: Option<Tier>,
    },

    /// Print the most popular commanders
    Top {
        #[arg(short, long, default_value_t = 100)]
        n: usize,
        #[arg(short, long, value_enum, default_value_t = Window::All)]
        timeframe: Window,
        /// Color identity letters, e.g. `-c w -c u` for azorius
        #[arg(short, long, conflicts_with = "timeframe")]
        colors: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Tier {
    Budget,
    Expensive,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Window {
    Week,
    Month,
    All,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut builder = Edhrec::builder();
    if let Some(cookies) = args.cookies {
        builder = builder.cookies(cookies);
    }
    let client = builder.build()?;

    match args.command {
        Command::BuildId => println!("{}", client.build_id().await),
        Command::Commander { name } => {
            let data = client.commander_data(&name).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Command::AverageDeck { name, budget } => {
            let budget = budget.map(|tier| match tier {
                Tier::Budget => Budget::Budget,
                Tier::Expensive => Budget::Expensive,
            });
            let deck = client.average_deck(&name, budget).await?;
            println!("{}", serde_json::to_string_pretty(&deck)?);
        }
        Command::Top {
            n,
            timeframe,
            colors,
        } => {
            if colors.is_empty() {
                let timeframe = match timeframe {
                    Window::Week => Timeframe::Week,
                    Window::Month => Timeframe::Month,
                    Window::All => Timeframe::AllTime,
                };
                let top = client.top_commanders(timeframe, n);
                pin_mut!(top);
                while let Some(name) = top.try_next().await? {
                    println!("{name}");
                }
            } else {
                let top = client.top_commanders_by_color(&colors, n)?;
                pin_mut!(top);
                while let Some(name) = top.try_next().await? {
                    println!("{name}");
                }
            }
        }
    }
    Ok(())
}

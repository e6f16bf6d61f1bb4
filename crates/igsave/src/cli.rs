use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "igsave")]
#[command(author, version, about = "Extract Instagram post, reel and story media for the browser extension", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the local API server
    Serve {
        /// Port to listen on (defaults to PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Extract media from a single URL and print the result
    Extract {
        /// Post, reel or story URL
        url: String,

        /// Print the raw JSON result
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

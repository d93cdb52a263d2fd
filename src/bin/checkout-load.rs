use clap::Parser;

use wide_events::checkout::random_user_id;
use wide_events::simulator::send_checkout;

#[derive(Parser)]
#[command(name = "checkout-load")]
#[command(about = "Send a burst of checkout requests and print the responses", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080/checkout")]
    url: String,

    /// Number of requests to send.
    #[arg(short = 'n', long, default_value_t = 10)]
    count: u32,

    /// Fixed user id; a random one is used per request when omitted.
    #[arg(long)]
    user: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let (mut completed, mut declined) = (0u32, 0u32);
    for _ in 0..cli.count {
        let user = match &cli.user {
            Some(user) => user.clone(),
            None => random_user_id(&mut rand::thread_rng()),
        };

        let (status, body) = send_checkout(&client, &cli.url, Some(&user)).await?;
        if body.success {
            completed += 1;
        } else {
            declined += 1;
        }
        println!("{} {}", status.as_u16(), serde_json::to_string(&body)?);
    }

    println!("completed={} declined={}", completed, declined);
    Ok(())
}

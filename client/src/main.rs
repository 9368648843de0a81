use clap::Parser;
use client::bot::BotMotion;
use client::network::{Endpoints, SyncClient};
use log::{info, warn};
use rand::Rng;
use shared::{COMBAT_TAG_PORT, LEVEL_COMPLETION_PORT, PLAYER_LIST_PORT, POSITION_UPDATE_PORT};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless combat sync client", long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1")]
    server_host: IpAddr,

    #[arg(long, default_value_t = POSITION_UPDATE_PORT)]
    position_port: u16,

    #[arg(long, default_value_t = PLAYER_LIST_PORT)]
    list_port: u16,

    #[arg(long, default_value_t = COMBAT_TAG_PORT)]
    combat_port: u16,

    #[arg(long, default_value_t = LEVEL_COMPLETION_PORT)]
    level_port: u16,

    /// Player id; a random one is generated when omitted
    #[arg(short = 'p', long)]
    player_id: Option<String>,

    /// Combat group to join before moving
    #[arg(short = 'c', long)]
    combat_id: Option<String>,

    #[arg(long, default_value = "red")]
    color: String,

    /// Number of position updates to send before exiting
    #[arg(short = 'n', long, default_value_t = 100)]
    updates: u32,

    #[arg(long, default_value_t = 10)]
    rate_hz: u32,

    /// Ask for the player list every this many updates
    #[arg(long, default_value_t = 10)]
    list_every: u32,

    /// Level to report as finished once all updates are sent
    #[arg(long)]
    complete_level: Option<i64>,

    /// How long to wait for replies, in milliseconds
    #[arg(long, default_value_t = 1000)]
    reply_timeout_ms: u64,
}

impl Args {
    fn endpoints(&self) -> Endpoints {
        Endpoints {
            position: SocketAddr::new(self.server_host, self.position_port),
            list: SocketAddr::new(self.server_host, self.list_port),
            combat: SocketAddr::new(self.server_host, self.combat_port),
            level: SocketAddr::new(self.server_host, self.level_port),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut rng = rand::thread_rng();

    let player_id = args
        .player_id
        .clone()
        .unwrap_or_else(|| format!("bot-{:08x}", rng.gen::<u32>()));
    let reply_timeout = Duration::from_millis(args.reply_timeout_ms);

    info!("Starting client {}...", player_id);
    info!("Connecting to: {}", args.server_host);

    let client = SyncClient::new(&player_id, args.endpoints()).await?;

    if let Some(combat_id) = &args.combat_id {
        client.assign_combat_tag(combat_id).await?;
        info!("Joined combat group {}", combat_id);
    }

    let mut motion = BotMotion::random(&mut rng, 20);
    let period = Duration::from_secs_f64(1.0 / args.rate_hz.max(1) as f64);
    let mut ticker = tokio::time::interval(period);
    let list_every = args.list_every.max(1);

    for update in 1..=args.updates {
        ticker.tick().await;
        motion.step(&mut rng);
        client
            .send_position(motion.position(), motion.velocity(), &args.color)
            .await?;

        if update % list_every == 0 {
            match client.request_player_list(reply_timeout).await {
                Ok(list) => {
                    let ids: Vec<&str> = list.players.iter().map(|p| p.id.as_str()).collect();
                    info!("Update {}: {} other players {:?}", update, ids.len(), ids);
                }
                Err(e) => warn!("Player list request failed: {}", e),
            }
        }
    }

    if let (Some(combat_id), Some(level)) = (&args.combat_id, args.complete_level) {
        let response = client
            .report_level_completion(combat_id, level, reply_timeout)
            .await?;
        if let Some(message) = &response.error {
            warn!("Server rejected level report: {}", message);
        } else if response.all_completed {
            info!("Group finished level {:?}", response.current_level);
        } else {
            info!(
                "Still waiting on {:?}",
                response.waiting_for_players.unwrap_or_default()
            );
        }
    }

    info!("Client {} done", player_id);
    Ok(())
}

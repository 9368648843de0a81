//! Server network layer: two UDP and two TCP endpoints feeding the registry
//!
//! Every datagram and every accepted connection is handled on its own task.
//! Decoding happens before any lock is taken and replies are sent after all
//! locks are released.

use crate::config::ServerConfig;
use crate::levels::LevelTracker;
use crate::registry::{PlayerRegistry, PlayerState};
use crate::sweeper::Sweeper;
use log::{debug, error, info, warn};
use shared::control::{decode_combat_tag, decode_level_completion, encode, is_complete_message};
use shared::position::{decode_list_request, decode_position_update, encode_player_list};
use shared::{get_timestamp, LevelCompletionResponse, PlayerRecord, MAX_CONTROL_MESSAGE};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

const DATAGRAM_BUFFER: usize = 2048;

pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// Addresses the four endpoints actually bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerAddrs {
    pub position: SocketAddr,
    pub list: SocketAddr,
    pub combat: SocketAddr,
    pub level: SocketAddr,
}

/// All four listeners plus the shared state they feed
pub struct Server {
    position_socket: Arc<UdpSocket>,
    list_socket: Arc<UdpSocket>,
    combat_listener: TcpListener,
    level_listener: TcpListener,
    registry: Arc<PlayerRegistry>,
    levels: Arc<LevelTracker>,
    sweep_interval: Duration,
    player_timeout_ms: u64,
    read_timeout: Option<Duration>,
}

impl Server {
    /// Binds every endpoint; any bind failure aborts startup
    pub async fn bind(
        config: &ServerConfig,
        registry: Arc<PlayerRegistry>,
        levels: Arc<LevelTracker>,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let position_socket = Arc::new(UdpSocket::bind(config.addr(config.position_port)?).await?);
        let list_socket = Arc::new(UdpSocket::bind(config.addr(config.list_port)?).await?);
        let combat_listener = TcpListener::bind(config.addr(config.combat_port)?).await?;
        let level_listener = TcpListener::bind(config.addr(config.level_port)?).await?;

        Ok(Server {
            position_socket,
            list_socket,
            combat_listener,
            level_listener,
            registry,
            levels,
            sweep_interval: config.sweep_interval(),
            player_timeout_ms: config.player_timeout_ms,
            read_timeout: config.tcp_read_timeout(),
        })
    }

    pub fn local_addrs(&self) -> io::Result<ServerAddrs> {
        Ok(ServerAddrs {
            position: self.position_socket.local_addr()?,
            list: self.list_socket.local_addr()?,
            combat: self.combat_listener.local_addr()?,
            level: self.level_listener.local_addr()?,
        })
    }

    /// Runs the listeners and the sweeper; returns only if one of them stops
    pub async fn run(self) -> Result<(), ServerError> {
        let addrs = self.local_addrs()?;
        info!("UDP position updates listening on {}", addrs.position);
        info!("UDP player lists listening on {}", addrs.list);
        info!("TCP combat tags listening on {}", addrs.combat);
        info!("TCP level completion listening on {}", addrs.level);

        let Server {
            position_socket,
            list_socket,
            combat_listener,
            level_listener,
            registry,
            levels,
            sweep_interval,
            player_timeout_ms,
            read_timeout,
        } = self;

        let sweeper = Sweeper::new(Arc::clone(&registry), sweep_interval, player_timeout_ms).spawn();
        let position = tokio::spawn(position_loop(position_socket, Arc::clone(&registry)));
        let list = tokio::spawn(list_loop(list_socket, Arc::clone(&registry)));
        let combat = tokio::spawn(combat_loop(combat_listener, registry, read_timeout));
        let level = tokio::spawn(level_loop(level_listener, levels, read_timeout));

        info!("Server started successfully");

        tokio::select! {
            result = sweeper => result?,
            result = position => result?,
            result = list => result?,
            result = combat => result?,
            result = level => result?,
        }

        warn!("A server task stopped, shutting down");
        Ok(())
    }
}

async fn position_loop(socket: Arc<UdpSocket>, registry: Arc<PlayerRegistry>) {
    let mut buffer = [0u8; DATAGRAM_BUFFER];

    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, addr)) => {
                let data = buffer[..len].to_vec();
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    handle_position_update(&registry, &data, addr).await;
                });
            }
            Err(e) => {
                error!("Error receiving position update: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn list_loop(socket: Arc<UdpSocket>, registry: Arc<PlayerRegistry>) {
    let mut buffer = [0u8; DATAGRAM_BUFFER];

    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, addr)) => {
                let data = buffer[..len].to_vec();
                let socket = Arc::clone(&socket);
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    if let Err(e) = handle_player_list_request(&registry, &socket, &data, addr).await {
                        error!("Failed to send player list to {}: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Error receiving player list request: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn combat_loop(
    listener: TcpListener,
    registry: Arc<PlayerRegistry>,
    read_timeout: Option<Duration>,
) {
    loop {
        match listener.accept().await {
            Ok((mut stream, addr)) => {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    debug!("Combat tag connection from {}", addr);
                    handle_combat_tag(&registry, &mut stream, read_timeout).await;
                });
            }
            Err(e) => {
                error!("TCP accept error on combat tag endpoint: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn level_loop(
    listener: TcpListener,
    levels: Arc<LevelTracker>,
    read_timeout: Option<Duration>,
) {
    loop {
        match listener.accept().await {
            Ok((mut stream, addr)) => {
                let levels = Arc::clone(&levels);
                tokio::spawn(async move {
                    debug!("Level completion connection from {}", addr);
                    handle_level_completion(&levels, &mut stream, read_timeout).await;
                });
            }
            Err(e) => {
                error!("TCP accept error on level completion endpoint: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Decodes a position push and applies it; malformed datagrams are dropped
pub async fn handle_position_update(registry: &PlayerRegistry, data: &[u8], addr: SocketAddr) {
    let update = match decode_position_update(data) {
        Ok(update) => update,
        Err(e) => {
            warn!("Dropping position update from {}: {}", addr, e);
            return;
        }
    };

    debug!(
        "Position update for player {}: pos=({},{}), vel=({},{}), color={}",
        update.player_id, update.x, update.y, update.vel_x, update.vel_y, update.color
    );
    registry.upsert_from_position(&update, addr).await;
}

/// Answers a list request with every other player in the requester's group.
///
/// Unknown requesters and ungrouped requesters get the unfiltered list.
pub async fn handle_player_list_request(
    registry: &PlayerRegistry,
    socket: &UdpSocket,
    data: &[u8],
    addr: SocketAddr,
) -> io::Result<usize> {
    let player_id = decode_list_request(data);
    let group = registry
        .touch(&player_id, addr, get_timestamp())
        .await
        .unwrap_or_default();

    let records: Vec<PlayerRecord> = registry
        .list_excluding(&player_id, &group)
        .await
        .iter()
        .map(PlayerState::to_record)
        .collect();
    let packet = encode_player_list(&records, get_timestamp());

    debug!(
        "Sending {} players to '{}' at {} (group '{}')",
        records.len(),
        player_id,
        addr,
        group
    );
    socket.send_to(&packet, addr).await
}

/// Reads one control message.
///
/// Stops at the first complete JSON value, at end of stream, or once
/// [`MAX_CONTROL_MESSAGE`] bytes have arrived.
pub async fn read_control_message<S>(stream: &mut S) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut data = Vec::with_capacity(512);
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
        if data.len() >= MAX_CONTROL_MESSAGE || is_complete_message(&data) {
            break;
        }
    }

    if data.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before a message arrived",
        ));
    }

    Ok(data)
}

async fn read_with_deadline<S>(stream: &mut S, deadline: Option<Duration>) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, read_control_message(stream))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "control message read timed out"))?,
        None => read_control_message(stream).await,
    }
}

/// Handles one combat-tag connection. Nothing is ever written back.
pub async fn handle_combat_tag<S>(
    registry: &PlayerRegistry,
    stream: &mut S,
    read_timeout: Option<Duration>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let data = match read_with_deadline(stream, read_timeout).await {
        Ok(data) => data,
        Err(e) => {
            error!("Error reading combat tag message: {}", e);
            return;
        }
    };

    match decode_combat_tag(&data) {
        Ok(request) => {
            registry
                .upsert_group_tag(&request.player_id, &request.combat_id, get_timestamp())
                .await;
        }
        Err(e) => warn!("Rejected combat tag message: {}", e),
    }

    if let Err(e) = stream.shutdown().await {
        debug!("Combat tag connection shutdown failed: {}", e);
    }
}

/// Handles one level-completion connection and writes exactly one reply
/// unless the read itself fails.
pub async fn handle_level_completion<S>(
    levels: &LevelTracker,
    stream: &mut S,
    read_timeout: Option<Duration>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let data = match read_with_deadline(stream, read_timeout).await {
        Ok(data) => data,
        Err(e) => {
            error!("Error reading level completion message: {}", e);
            return;
        }
    };

    let response = match decode_level_completion(&data) {
        Ok(request) => {
            info!(
                "Player {} completed level {} (combat '{}')",
                request.player_id,
                request.level(),
                request.combat_id
            );
            levels
                .report_completion(&request.player_id, &request.combat_id, request.level())
                .await
                .to_response()
        }
        Err(e) => {
            warn!("Rejected level completion message: {}", e);
            LevelCompletionResponse::error(e.reply_text())
        }
    };

    if let Err(e) = write_response(stream, &response).await {
        error!("Failed to send level completion reply: {}", e);
    }
}

async fn write_response<S>(stream: &mut S, response: &LevelCompletionResponse) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let body = encode(response)?;
    stream.write_all(&body).await?;
    stream.flush().await?;
    stream.shutdown().await
}

use log::{debug, info, warn};
use shared::control::{decode_level_response, encode};
use shared::position::{decode_player_list, encode_list_request, encode_position_update};
use shared::{
    get_timestamp, CombatTagRequest, ControlError, DecodeError, LevelCompletionRequest,
    LevelCompletionResponse, PlayerList, PositionUpdate, COMBAT_TAG_PORT, LEVEL_COMPLETION_PORT,
    PLAYER_LIST_PORT, POSITION_UPDATE_PORT,
};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::{timeout, Instant};

/// Largest UDP payload; player lists can get big
const LIST_BUFFER: usize = 65_536;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Io(#[from] io::Error),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("bad player list: {0}")]
    Decode(#[from] DecodeError),
    #[error("bad control reply: {0}")]
    Control(#[from] ControlError),
    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the server's four endpoints live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub position: SocketAddr,
    pub list: SocketAddr,
    pub combat: SocketAddr,
    pub level: SocketAddr,
}

impl Endpoints {
    /// Default ports on a single host
    pub fn on_host(host: IpAddr) -> Self {
        Self {
            position: SocketAddr::new(host, POSITION_UPDATE_PORT),
            list: SocketAddr::new(host, PLAYER_LIST_PORT),
            combat: SocketAddr::new(host, COMBAT_TAG_PORT),
            level: SocketAddr::new(host, LEVEL_COMPLETION_PORT),
        }
    }
}

/// One player's connection to the sync server.
///
/// Position pushes and list requests share a single UDP socket. Control
/// messages open a fresh TCP connection each time.
pub struct SyncClient {
    player_id: String,
    socket: UdpSocket,
    endpoints: Endpoints,
}

impl SyncClient {
    pub async fn new(player_id: &str, endpoints: Endpoints) -> Result<Self, ClientError> {
        let bind_addr: SocketAddr = if endpoints.position.is_ipv4() {
            "0.0.0.0:0".parse().map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?
        } else {
            "[::]:0".parse().map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        info!(
            "Client {} bound to {}",
            player_id,
            socket.local_addr()?
        );

        Ok(SyncClient {
            player_id: player_id.to_string(),
            socket,
            endpoints,
        })
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Pushes this player's position, stamped with the local clock
    pub async fn send_position(
        &self,
        position: (i32, i32),
        velocity: (i32, i32),
        color: &str,
    ) -> Result<(), ClientError> {
        let update = PositionUpdate {
            player_id: self.player_id.clone(),
            timestamp: get_timestamp(),
            x: position.0,
            y: position.1,
            vel_x: velocity.0,
            vel_y: velocity.1,
            color: color.to_string(),
        };
        self.socket
            .send_to(&encode_position_update(&update), self.endpoints.position)
            .await?;
        Ok(())
    }

    /// Asks for everyone else in this player's group and waits for the reply.
    ///
    /// Datagrams from anywhere but the list endpoint are skipped.
    pub async fn request_player_list(&self, wait: Duration) -> Result<PlayerList, ClientError> {
        self.socket
            .send_to(&encode_list_request(&self.player_id), self.endpoints.list)
            .await?;

        let deadline = Instant::now() + wait;
        let mut buffer = vec![0u8; LIST_BUFFER];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let (len, from) = timeout(remaining, self.socket.recv_from(&mut buffer))
                .await
                .map_err(|_| ClientError::Timeout(wait))??;

            if from != self.endpoints.list {
                warn!("Ignoring datagram from unexpected sender {}", from);
                continue;
            }

            let list = decode_player_list(&buffer[..len])?;
            debug!("Received {} players", list.players.len());
            return Ok(list);
        }
    }

    /// Joins `combat_id`. The server never answers this message.
    pub async fn assign_combat_tag(&self, combat_id: &str) -> Result<(), ClientError> {
        let request = CombatTagRequest {
            player_id: self.player_id.clone(),
            combat_id: combat_id.to_string(),
        };

        let mut stream = TcpStream::connect(self.endpoints.combat).await?;
        stream.write_all(&encode(&request)?).await?;
        stream.shutdown().await?;
        Ok(())
    }

    /// Reports finishing `level` and returns the group's verdict
    pub async fn report_level_completion(
        &self,
        combat_id: &str,
        level: i64,
        wait: Duration,
    ) -> Result<LevelCompletionResponse, ClientError> {
        let request = LevelCompletionRequest::new(&self.player_id, combat_id, level);

        let exchange = async {
            let mut stream = TcpStream::connect(self.endpoints.level).await?;
            stream.write_all(&encode(&request)?).await?;

            let mut reply = Vec::new();
            stream.read_to_end(&mut reply).await?;
            Ok::<_, ClientError>(decode_level_response(&reply)?)
        };

        timeout(wait, exchange)
            .await
            .map_err(|_| ClientError::Timeout(wait))?
    }
}

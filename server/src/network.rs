//! Server network layer: TCP connections, framing and the tick loop

use crate::client_manager::{ClientManager, ConnId};
use crate::config::ServerConfig;
use crate::game::sync::{snapshot, sync_packets};
use crate::game::{Command, GameState};
use log::{debug, error, info, warn};
use shared::wire::{read_packet, write_packet};
use shared::{ClientId, Packet, PROTOCOL_VERSION};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

pub type NetError = Box<dyn std::error::Error + Send + Sync>;

/// Longest simulated step, however late a tick fires.
const MAX_TICK_DT: f32 = 0.05;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        conn: ConnId,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Packet>,
    },
    PacketReceived {
        conn: ConnId,
        packet: Packet,
    },
    ConnectionClosed {
        conn: ConnId,
    },
    ClientTimeout {
        client_id: ClientId,
    },
    Shutdown,
}

/// An accepted socket that has not sent `Connect` yet.
struct Connection {
    addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Packet>,
}

/// Main server coordinating networking and game simulation
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: Arc<RwLock<ClientManager>>,
    game: GameState,
    tick_duration: Duration,
    connections: HashMap<ConnId, Connection>,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(addr: &str, config: ServerConfig) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let tick_duration = config.tick_duration();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: Arc::new(RwLock::new(ClientManager::new(
                config.max_clients,
                config.client_timeout,
            ))),
            game: GameState::new(config.rules, config.seed),
            tick_duration,
            connections: HashMap::new(),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the loop from outside with `ServerMessage::Shutdown`.
    pub fn sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Spawns the task that accepts connections and starts a reader and a
    /// writer task for each one
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut next_conn: ConnId = 1;
            loop {
                let (stream, addr) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        continue;
                    }
                };
                if let Err(e) = stream.set_nodelay(true) {
                    warn!("Could not disable Nagle for {}: {}", addr, e);
                }

                let conn = next_conn;
                next_conn += 1;
                let (mut reader, mut writer) = stream.into_split();
                let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Packet>();

                tokio::spawn(async move {
                    while let Some(packet) = outbound_rx.recv().await {
                        if let Err(e) = write_packet(&mut writer, &packet).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                            break;
                        }
                    }
                    let _ = writer.shutdown().await;
                });

                if server_tx
                    .send(ServerMessage::Connected {
                        conn,
                        addr,
                        outbound,
                    })
                    .is_err()
                {
                    break;
                }

                let reader_tx = server_tx.clone();
                tokio::spawn(async move {
                    loop {
                        match read_packet(&mut reader).await {
                            Ok(Some(packet)) => {
                                if reader_tx
                                    .send(ServerMessage::PacketReceived { conn, packet })
                                    .is_err()
                                {
                                    return;
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                warn!("Dropping connection from {}: {}", addr, e);
                                break;
                            }
                        }
                    }
                    let _ = reader_tx.send(ServerMessage::ConnectionClosed { conn });
                });
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn handle_connect(&mut self, conn: ConnId, client_version: u32, session: Option<u64>) {
        let Some(connection) = self.connections.remove(&conn) else {
            debug!("Repeated connect on connection {} ignored", conn);
            return;
        };
        info!(
            "Client connecting from {} (version: {})",
            connection.addr, client_version
        );

        if client_version != PROTOCOL_VERSION {
            let _ = connection.outbound.send(Packet::Disconnected {
                reason: format!("Unsupported protocol version {}", client_version),
            });
            return;
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(conn, connection.addr, connection.outbound.clone())
        };

        let Some(client_id) = client_id else {
            let _ = connection.outbound.send(Packet::Disconnected {
                reason: "Server full".to_string(),
            });
            return;
        };

        let joined = self.game.join(client_id, session);
        let welcome = Packet::Welcome {
            client_id,
            session: joined.session,
            role: joined.role,
            rules: self.game.rules().clone(),
        };

        let clients = self.clients.read().await;
        clients.send_to(client_id, welcome);
        for packet in sync_packets(&self.game) {
            clients.send_to(client_id, packet);
        }
    }

    /// Routes one incoming packet. Only `Connect` is honoured from a
    /// connection that has not joined yet.
    async fn handle_packet(&mut self, conn: ConnId, packet: Packet) {
        let client_id = {
            let clients = self.clients.read().await;
            clients.find_client_by_conn(conn)
        };

        match (packet, client_id) {
            (
                Packet::Connect {
                    client_version,
                    session,
                },
                _,
            ) => self.handle_connect(conn, client_version, session).await,
            (_, None) => debug!("Ignoring packet from connection {} before connect", conn),
            (Packet::Heartbeat, Some(client_id)) => {
                self.clients.write().await.touch(client_id);
            }
            (Packet::Disconnect, Some(client_id)) => {
                self.clients.write().await.remove_client(&client_id);
                self.game.leave(client_id);
            }
            (packet, Some(client_id)) => match Command::from_packet(&packet) {
                Some(command) => {
                    self.clients.write().await.queue_command(client_id, command);
                }
                None => warn!("Unexpected packet type from client {}", client_id),
            },
        }
    }

    async fn handle_closed(&mut self, conn: ConnId) {
        self.connections.remove(&conn);
        let client_id = {
            let mut clients = self.clients.write().await;
            let found = clients.find_client_by_conn(conn);
            if let Some(id) = found {
                clients.remove_client(&id);
            }
            found
        };
        if let Some(client_id) = client_id {
            self.game.leave(client_id);
        }
    }

    /// Applies queued commands, advances the match and sends the results
    async fn run_tick(&mut self, dt: f32) {
        let commands = self.clients.write().await.drain_commands();
        for (client_id, command) in commands {
            if let Err(reason) = self.game.handle_command(client_id, command) {
                debug!("Rejected command from client {}: {}", client_id, reason);
            }
        }

        self.game.tick(dt);

        let clients = self.clients.read().await;
        for outgoing in self.game.drain_outbox() {
            clients.deliver(outgoing);
        }
        if !clients.is_empty() {
            clients.broadcast(&snapshot(&self.game));
        }

        if self.game.tick % 60 == 0 && !clients.is_empty() {
            debug!(
                "Tick {}: {} clients, {:.1}Hz, {} projectiles",
                self.game.tick,
                clients.len(),
                1.0 / dt.max(f32::EPSILON),
                self.game.projectile_count()
            );
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), NetError> {
        self.spawn_acceptor();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Connected { conn, addr, outbound }) => {
                            debug!("Connection {} opened from {}", conn, addr);
                            self.connections.insert(conn, Connection { addr, outbound });
                        }
                        Some(ServerMessage::PacketReceived { conn, packet }) => {
                            self.handle_packet(conn, packet).await;
                        }
                        Some(ServerMessage::ConnectionClosed { conn }) => {
                            self.handle_closed(conn).await;
                        }
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.game.leave(client_id);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32().min(MAX_TICK_DT);
                    last_tick = now;
                    self.run_tick(dt).await;
                },
            }
        }

        Ok(())
    }
}

//! Connected clients and their queued commands.
//!
//! The manager owns one outbound channel per client; the connection's writer
//! task drains it onto the socket. Gameplay commands from every client land
//! in a single queue so the tick applies them in the order they arrived.

use crate::game::{Audience, Command, Outgoing};
use log::{info, warn};
use shared::{ClientId, Packet};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// Identifies one accepted TCP connection, bound to a client or not.
pub type ConnId = u64;

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub conn: ConnId,
    pub addr: SocketAddr,
    /// Last time any packet arrived from this client
    pub last_seen: Instant,
    outbound: UnboundedSender<Packet>,
}

impl Client {
    pub fn new(id: ClientId, conn: ConnId, addr: SocketAddr, outbound: UnboundedSender<Packet>) -> Self {
        Self {
            id,
            conn,
            addr,
            last_seen: Instant::now(),
            outbound,
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    /// Queues a packet for the writer task. False once the connection is gone.
    pub fn send(&self, packet: Packet) -> bool {
        self.outbound.send(packet).is_ok()
    }
}

pub struct ClientManager {
    clients: HashMap<ClientId, Client>,
    next_client_id: ClientId,
    max_clients: usize,
    timeout: Duration,
    /// Commands from all clients, in receipt order.
    pending: Vec<(ClientId, Command)>,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
            pending: Vec::new(),
        }
    }

    /// Binds a connection to a fresh client id. `None` when the server is full.
    pub fn add_client(
        &mut self,
        conn: ConnId,
        addr: SocketAddr,
        outbound: UnboundedSender<Packet>,
    ) -> Option<ClientId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, conn, addr, outbound));
        Some(client_id)
    }

    /// Drops the client and anything it still had queued.
    pub fn remove_client(&mut self, client_id: &ClientId) -> bool {
        match self.clients.remove(client_id) {
            Some(client) => {
                self.pending.retain(|(id, _)| id != client_id);
                info!("Client {} disconnected", client.id);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    pub fn find_client_by_conn(&self, conn: ConnId) -> Option<ClientId> {
        self.clients
            .values()
            .find(|client| client.conn == conn)
            .map(|client| client.id)
    }

    pub fn touch(&mut self, client_id: ClientId) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    pub fn queue_command(&mut self, client_id: ClientId, command: Command) -> bool {
        if !self.clients.contains_key(&client_id) {
            return false;
        }
        self.touch(client_id);
        self.pending.push((client_id, command));
        true
    }

    pub fn drain_commands(&mut self) -> Vec<(ClientId, Command)> {
        std::mem::take(&mut self.pending)
    }

    /// Removes clients silent for longer than the timeout and returns their ids.
    pub fn check_timeouts(&mut self) -> Vec<ClientId> {
        let timed_out: Vec<ClientId> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(self.timeout))
            .map(|client| client.id)
            .collect();

        for client_id in &timed_out {
            warn!("Client {} timed out", client_id);
            self.remove_client(client_id);
        }
        timed_out
    }

    pub fn send_to(&self, client_id: ClientId, packet: Packet) -> bool {
        self.clients
            .get(&client_id)
            .map_or(false, |client| client.send(packet))
    }

    pub fn broadcast(&self, packet: &Packet) {
        for client in self.clients.values() {
            client.send(packet.clone());
        }
    }

    pub fn deliver(&self, outgoing: Outgoing) {
        match outgoing.audience {
            Audience::All => self.broadcast(&outgoing.packet),
            Audience::Only(client_id) => {
                self.send_to(client_id, outgoing.packet);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn channel() -> (UnboundedSender<Packet>, UnboundedReceiver<Packet>) {
        unbounded_channel()
    }

    #[test]
    fn test_client_timeout() {
        let (tx, _rx) = channel();
        let mut client = Client::new(1, 7, test_addr(), tx);
        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(2, Duration::from_secs(10));
        let (tx, _rx) = channel();

        assert_eq!(manager.add_client(1, test_addr(), tx.clone()), Some(1));
        assert_eq!(manager.add_client(2, test_addr(), tx.clone()), Some(2));
        assert_eq!(manager.add_client(3, test_addr(), tx), None);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_find_and_remove_by_conn() {
        let mut manager = ClientManager::new(2, Duration::from_secs(10));
        let (tx, _rx) = channel();
        let id = manager.add_client(42, test_addr(), tx).unwrap();

        assert_eq!(manager.find_client_by_conn(42), Some(id));
        assert_eq!(manager.find_client_by_conn(43), None);
        assert!(manager.remove_client(&id));
        assert!(!manager.remove_client(&id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_commands_keep_receipt_order() {
        let mut manager = ClientManager::new(2, Duration::from_secs(10));
        let (tx, _rx) = channel();
        let a = manager.add_client(1, test_addr(), tx.clone()).unwrap();
        let b = manager.add_client(2, test_addr(), tx).unwrap();

        manager.queue_command(b, Command::AdvancePhase);
        manager.queue_command(a, Command::SelectSpawnRoom(3));
        manager.queue_command(b, Command::SelectSpawnRoom(4));
        assert!(!manager.queue_command(99, Command::AdvancePhase));

        let drained = manager.drain_commands();
        assert_eq!(
            drained,
            vec![
                (b, Command::AdvancePhase),
                (a, Command::SelectSpawnRoom(3)),
                (b, Command::SelectSpawnRoom(4)),
            ]
        );
        assert!(manager.drain_commands().is_empty());
    }

    #[test]
    fn test_removed_client_commands_are_dropped() {
        let mut manager = ClientManager::new(2, Duration::from_secs(10));
        let (tx, _rx) = channel();
        let a = manager.add_client(1, test_addr(), tx).unwrap();
        manager.queue_command(a, Command::AdvancePhase);
        manager.remove_client(&a);
        assert!(manager.drain_commands().is_empty());
    }

    #[test]
    fn test_deliver_routes_by_audience() {
        let mut manager = ClientManager::new(2, Duration::from_secs(10));
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        let a = manager.add_client(1, test_addr(), tx_a).unwrap();
        manager.add_client(2, test_addr(), tx_b).unwrap();

        manager.deliver(Outgoing {
            audience: Audience::Only(a),
            packet: Packet::BaseRevealed,
        });
        manager.deliver(Outgoing {
            audience: Audience::All,
            packet: Packet::Heartbeat,
        });

        assert_eq!(rx_a.try_recv().unwrap(), Packet::BaseRevealed);
        assert_eq!(rx_a.try_recv().unwrap(), Packet::Heartbeat);
        assert_eq!(rx_b.try_recv().unwrap(), Packet::Heartbeat);
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_check_timeouts_removes_silent_clients() {
        let mut manager = ClientManager::new(2, Duration::from_millis(500));
        let (tx, _rx) = channel();
        let id = manager.add_client(1, test_addr(), tx).unwrap();
        if let Some(client) = manager.clients.get_mut(&id) {
            client.last_seen = Instant::now() - Duration::from_secs(1);
        }

        assert_eq!(manager.check_timeouts(), vec![id]);
        assert!(manager.is_empty());
    }
}

/// The protocol phase a connection is in. Each phase has its own packet tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Handshake,
    Login,
    Configuration,
    Play,
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 4] = [
        ConnectionState::Handshake,
        ConnectionState::Login,
        ConnectionState::Configuration,
        ConnectionState::Play,
    ];

    /// Resolve the handshake intent. Only login (2) and transfer (3) enter the fallback.
    pub fn from_handshake_intent(intent: i32) -> Option<Self> {
        match intent {
            2 | 3 => Some(ConnectionState::Login),
            _ => None,
        }
    }
}

/// Which way a packet travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server.
    Serverbound,
    /// Server to client.
    Clientbound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_intent() {
        assert_eq!(ConnectionState::from_handshake_intent(1), None);
        assert_eq!(
            ConnectionState::from_handshake_intent(2),
            Some(ConnectionState::Login)
        );
        assert_eq!(
            ConnectionState::from_handshake_intent(3),
            Some(ConnectionState::Login)
        );
        assert_eq!(ConnectionState::from_handshake_intent(7), None);
    }
}

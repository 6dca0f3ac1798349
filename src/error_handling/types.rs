use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadIPFormatting(String),
    BadPort(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::BadPort(e) => write!(f, "Port error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failure of a single management-interface exchange.
#[derive(Debug)]
pub enum TransportError {
    /// The TCP connection could not be established.
    Connect(std::io::Error),
    /// The whole exchange did not finish within the configured bound.
    Timeout(Duration),
    /// The peer went away before the command could be delivered.
    Closed,
    /// Any other socket failure while reading the reply.
    Io(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(e) => write!(f, "Management connect failed: {}", e),
            TransportError::Timeout(d) => {
                write!(f, "Management exchange timed out after {:?}", d)
            }
            TransportError::Closed => write!(f, "Management peer closed the connection"),
            TransportError::Io(e) => write!(f, "Management socket error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Connect(e) | TransportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    ConnectionFailed,
    WriteFailed,
    ReadFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed => write!(f, "Storage connection failed"),
            StorageError::WriteFailed => write!(f, "Storage write failed"),
            StorageError::ReadFailed => write!(f, "Storage read failed"),
        }
    }
}

impl std::error::Error for StorageError {}

/// A recording cycle only fails as a whole when the daemon could not be polled, or
/// when it was refused because another cycle is still running.
#[derive(Debug)]
pub enum RecorderError {
    Transport(TransportError),
    CycleInProgress,
}

impl fmt::Display for RecorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderError::Transport(e) => write!(f, "Recording cycle aborted: {}", e),
            RecorderError::CycleInProgress => write!(f, "A recording cycle is already running"),
        }
    }
}

impl std::error::Error for RecorderError {}

impl From<TransportError> for RecorderError {
    fn from(err: TransportError) -> Self {
        RecorderError::Transport(err)
    }
}

#[derive(Debug)]
pub enum SessionError {
    Transport(TransportError),
    StorageError(StorageError),
    InvalidName(String),
    InvalidLimit(u64),
    CycleInProgress,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Transport(e) => write!(f, "Management interface unavailable: {}", e),
            SessionError::StorageError(e) => write!(f, "Storage error: {}", e),
            SessionError::InvalidName(name) => write!(f, "Invalid session name: {:?}", name),
            SessionError::InvalidLimit(limit) => {
                write!(f, "History limit must be positive, got {}", limit)
            }
            SessionError::CycleInProgress => write!(f, "A recording cycle is already running"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        SessionError::Transport(err)
    }
}

impl From<RecorderError> for SessionError {
    fn from(err: RecorderError) -> Self {
        match err {
            RecorderError::Transport(e) => SessionError::Transport(e),
            RecorderError::CycleInProgress => SessionError::CycleInProgress,
        }
    }
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        SessionError::StorageError(err)
    }
}

#[derive(Debug)]
pub enum WebError {
    BadBindAddress(String),
    ServerFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BadBindAddress(e) => write!(f, "Invalid web bind address: {}", e),
            WebError::ServerFailed(e) => write!(f, "Web server failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    StorageError(StorageError),
    WebError(WebError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

use std::fmt;
use std::io;

/// Classe de falha, como reportada ao usuário.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SocketCreationFailed,
    SendFailed,
    ReceiveFailed,
}

/// Erros do ciclo de sondagem ICMP.
#[derive(Debug)]
pub enum ProbeError {
    /// Não foi possível abrir o socket ICMP.
    SocketCreation(io::Error),
    /// O envio do Echo Request falhou.
    Send(io::Error),
    /// A recepção falhou (erro do SO ou timeout de leitura).
    Receive(io::Error),
    /// Chegou um datagrama curto demais para conter o campo de sequência.
    ShortReply(usize),
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::SocketCreation(_) => ErrorKind::SocketCreationFailed,
            ProbeError::Send(_) => ErrorKind::SendFailed,
            ProbeError::Receive(_) | ProbeError::ShortReply(_) => ErrorKind::ReceiveFailed,
        }
    }

    /// Falhas de recepção não encerram o loop; as demais sim.
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::ReceiveFailed
    }

    /// Verdadeiro quando o SO recusou o socket por falta de privilégios.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ProbeError::SocketCreation(e) if e.kind() == io::ErrorKind::PermissionDenied)
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::SocketCreation(e) => write!(f, "Failed to create socket: {}", e),
            ProbeError::Send(e) => write!(f, "Failed to send ICMP packet: {}", e),
            ProbeError::Receive(e) => write!(f, "Failed to receive ICMP reply: {}", e),
            ProbeError::ShortReply(n) => {
                write!(f, "Failed to receive ICMP reply: datagram too short ({} bytes)", n)
            }
        }
    }
}

// A mensagem já inclui o erro do SO; sem `source()` para não repeti-lo na cadeia.
impl std::error::Error for ProbeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_receive_failures_are_recoverable() {
        let other = || io::Error::new(io::ErrorKind::Other, "x");
        assert!(ProbeError::SocketCreation(other()).is_fatal());
        assert!(ProbeError::Send(other()).is_fatal());
        assert!(!ProbeError::Receive(other()).is_fatal());
        assert!(!ProbeError::ShortReply(12).is_fatal());
        assert_eq!(ProbeError::ShortReply(12).kind(), ErrorKind::ReceiveFailed);
    }

    #[test]
    fn permission_denied_only_matters_when_opening() {
        let err = ProbeError::SocketCreation(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(err.is_permission_denied());
        let err = ProbeError::Send(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn messages_name_the_failed_step() {
        let err = ProbeError::Receive(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        assert_eq!(err.to_string(), "Failed to receive ICMP reply: timed out");
    }

    #[test]
    fn fatal_errors_render_on_one_line() {
        let err = ProbeError::Send(io::Error::new(io::ErrorKind::Other, "network is unreachable"));
        let report = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(report, "Failed to send ICMP packet: network is unreachable");

        let err = ProbeError::SocketCreation(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let report = format!("{:#}", anyhow::Error::new(err).context("Sem privilégios"));
        assert_eq!(report.lines().count(), 1);
        assert_eq!(report.matches("denied").count(), 1);
    }
}

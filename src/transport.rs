// Criação e configuração de sockets de baixo nível
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use std::mem::MaybeUninit;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use crate::error::ProbeError;
use crate::icmp::REPLY_BUF_LEN;

/// Canal usado pelo motor de ping para enviar e receber datagramas ICMP.
pub trait Transport {
    /// Envia `packet` para `dst` e devolve quantos bytes foram enviados.
    fn send(&mut self, dst: Ipv4Addr, packet: &[u8]) -> Result<usize, ProbeError>;

    /// Bloqueia até chegar um datagrama; devolve o tamanho e o remetente.
    fn receive(&mut self, buf: &mut [u8]) -> Result<(usize, Ipv4Addr), ProbeError>;
}

/// Socket ICMPv4 do sistema operacional.
///
/// RAW em Linux e Windows; no macOS um socket DGRAM de ICMP, que também
/// entrega o cabeçalho IP e não exige root.
pub struct IcmpSocket {
    sock: Socket,
}

impl IcmpSocket {
    /// Abre o socket. `timeout` opcional vale para cada leitura; `None` bloqueia indefinidamente.
    pub fn open(timeout: Option<Duration>) -> Result<Self, ProbeError> {
        let sock = Socket::new(Domain::IPV4, socket_type(), Some(Protocol::ICMPV4))
            .map_err(ProbeError::SocketCreation)?;

        if timeout.is_some() {
            sock.set_read_timeout(timeout)
                .map_err(ProbeError::SocketCreation)?;
        }

        Ok(IcmpSocket { sock })
    }

    /// Libera o socket explicitamente.
    pub fn close(self) {
        drop(self.sock);
    }
}

#[cfg(target_os = "macos")]
fn socket_type() -> Type {
    Type::DGRAM
}

#[cfg(all(unix, not(target_os = "macos")))]
fn socket_type() -> Type {
    Type::from(libc::SOCK_RAW)
}

// SOCK_RAW é 3; usamos o valor direto pois libc::SOCK_RAW não está disponível no Windows.
#[cfg(windows)]
fn socket_type() -> Type {
    Type::from(3)
}

impl Transport for IcmpSocket {
    fn send(&mut self, dst: Ipv4Addr, packet: &[u8]) -> Result<usize, ProbeError> {
        // Porta 0 é ignorada para ICMP
        let addr = SockAddr::from(SocketAddrV4::new(dst, 0));
        self.sock.send_to(packet, &addr).map_err(ProbeError::Send)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<(usize, Ipv4Addr), ProbeError> {
        // Datagramas maiores que o buffer são truncados, como no recvfrom
        let mut raw = [MaybeUninit::<u8>::uninit(); REPLY_BUF_LEN];
        let len = buf.len().min(REPLY_BUF_LEN);
        let (n, from) = self.sock.recv_from(&mut raw[..len]).map_err(ProbeError::Receive)?;

        for (dst, src) in buf.iter_mut().zip(raw.iter().take(n)) {
            // SAFETY: recv_from inicializou os primeiros `n` bytes.
            *dst = unsafe { src.assume_init() };
        }

        let from = match from.as_socket() {
            Some(SocketAddr::V4(v4)) => *v4.ip(),
            _ => Ipv4Addr::UNSPECIFIED,
        };

        Ok((n, from))
    }
}

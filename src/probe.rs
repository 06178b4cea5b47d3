use log::trace;

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::ProbeError;
use crate::icmp::{self, EchoReply, ECHO_REQUEST_LEN, REPLY_BUF_LEN};
use crate::transport::Transport;

/// Intervalo fixo entre pings.
pub const INTERVAL: Duration = Duration::from_secs(1);

/// Resultado de uma sondagem que não derrubou o processo.
#[derive(Debug)]
pub enum Outcome {
    Reply(EchoReply),
    /// Falha de recepção: reportada, mas o loop continua.
    Lost(ProbeError),
}

/// Motor de Echo: dono do socket e do contador de sequência.
///
/// Há sempre no máximo um pedido pendente; a resposta é o próximo
/// datagrama que chegar.
pub struct Pinger<T: Transport> {
    transport: T,
    dst: Ipv4Addr,
    seq: u16,
    interval: Duration,
}

impl<T: Transport> Pinger<T> {
    pub fn new(transport: T, dst: Ipv4Addr) -> Self {
        Pinger {
            transport,
            dst,
            seq: 1,
            interval: INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Constrói o próximo Echo Request e avança a sequência (wrap em 16 bits).
    pub fn next_request(&mut self) -> [u8; ECHO_REQUEST_LEN] {
        let pkt = icmp::build_echo_request(self.seq);
        self.seq = self.seq.wrapping_add(1);
        pkt
    }

    /// Um ciclo completo: envia, espera a resposta e decodifica.
    ///
    /// `Err` só para falhas fatais (envio); falhas de recepção viram `Outcome::Lost`.
    pub fn probe(&mut self) -> Result<Outcome, ProbeError> {
        let pkt = self.next_request();

        self.transport.send(self.dst, &pkt)?;

        // Marca o instante do envio para calcular o RTT depois
        let t0 = Instant::now();

        let mut buf = [0u8; REPLY_BUF_LEN];
        let outcome = match self.transport.receive(&mut buf) {
            Ok((n, from)) => {
                let elapsed = t0.elapsed();
                trace!("{}", icmp::hex_dump(&buf[..n.min(buf.len())]));
                match EchoReply::decode(&buf, n, from, elapsed) {
                    Ok(reply) => Outcome::Reply(reply),
                    Err(e) => Outcome::Lost(e),
                }
            }
            Err(e) => Outcome::Lost(e),
        };

        Ok(outcome)
    }

    /// Loop principal: um ping por intervalo até `running` virar falso ou
    /// `count` sondagens serem feitas. Devolve quantas foram enviadas.
    pub fn run<F>(
        &mut self,
        running: &AtomicBool,
        count: Option<u64>,
        mut report: F,
    ) -> Result<u64, ProbeError>
    where
        F: FnMut(&Outcome),
    {
        let mut sent = 0u64;

        loop {
            if !running.load(Ordering::SeqCst) {
                break;
            }

            if let Some(limit) = count {
                if sent >= limit {
                    break;
                }
            }

            let outcome = self.probe()?;
            sent += 1;
            report(&outcome);

            // Se tiver limite, não dorme depois do último
            if count.is_some_and(|limit| sent >= limit) {
                break;
            }

            std::thread::sleep(self.interval);
        }

        Ok(sent)
    }

    /// Devolve o transporte, para fechá-lo no encerramento.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

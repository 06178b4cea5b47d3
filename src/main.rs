// Tratamento de erros ergonômico
use anyhow::{Context, Result};

// Logs em stderr (nível ajustável via RUST_LOG)
use log::{error, info};

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// Módulos locais
mod args;
mod error;
mod icmp;
mod probe;
mod transport;

use probe::{Outcome, Pinger};
use transport::IcmpSocket;

/// Programa principal: envia um Echo Request por segundo e aguarda o Echo Reply.
/// Requer privilégios para abrir socket RAW (root/CAP_NET_RAW, ou Administrador no Windows).
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Falhas fatais viram uma única linha em stderr e status 1
    match ping() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn ping() -> Result<()> {
    let args = args::parse()?;
    if args.help {
        println!("{}", args::USAGE);
        return Ok(());
    }

    // Ctrl+C: primeiro pedido encerra após a sondagem atual; o segundo sai na hora
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        if !r.swap(false, Ordering::SeqCst) {
            std::process::exit(130);
        }
    })
    .context("Erro ao configurar handler de Ctrl+C")?;

    let sock = IcmpSocket::open(args.timeout).map_err(|e| {
        if e.is_permission_denied() {
            anyhow::Error::new(e).context("Sem privilégios: execute como root ou conceda CAP_NET_RAW")
        } else {
            e.into()
        }
    })?;

    info!("PING {}: {} bytes de dados", args.dst, icmp::PAYLOAD.len());

    let mut pinger = Pinger::new(sock, args.dst);
    let sent = pinger
        .run(&running, args.count, |outcome| match outcome {
            Outcome::Reply(reply) => println!("{}", reply),
            Outcome::Lost(e) => error!("{}", e),
        })?;

    info!("{} pedidos enviados", sent);
    pinger.into_transport().close();

    Ok(())
}

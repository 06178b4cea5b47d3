use anyhow::{Context, Result};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Destino padrão (DNS público do Google).
pub const DEFAULT_DST: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

/// Menor timeout aceito em -W; abaixo disso o SO trunca para zero (= sem timeout).
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

pub const USAGE: &str = "Uso: pingrs_echo [<ipv4>] [-c <count>] [-W <timeout_s>]";

#[derive(Debug, PartialEq)]
pub struct PingArgs {
    pub dst: Ipv4Addr,
    pub count: Option<u64>,
    /// Timeout de leitura por sondagem; `None` bloqueia até chegar algo.
    pub timeout: Option<Duration>,
    pub help: bool,
}

pub fn parse() -> Result<PingArgs> {
    parse_from(std::env::args().skip(1))
}

pub fn parse_from<I>(args: I) -> Result<PingArgs>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();

    // -h vence qualquer outro argumento, mesmo inválido
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Ok(PingArgs {
            dst: DEFAULT_DST,
            count: None,
            timeout: None,
            help: true,
        });
    }

    let mut args = args.into_iter();
    let mut dst_str = None;
    let mut count = None;
    let mut timeout = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" => {
                let val = args.next().context("Faltou o valor para -c")?;
                let c: u64 = val.parse().context("Valor inválido para -c")?;
                count = Some(c);
            }
            "-W" => {
                let val = args.next().context("Faltou o valor para -W")?;
                let secs: f64 = val.parse().context("Valor inválido para -W")?;
                let t = Duration::try_from_secs_f64(secs).context("Valor inválido para -W")?;
                if t < MIN_TIMEOUT {
                    anyhow::bail!("O timeout de -W deve ser de pelo menos 1 ms");
                }
                timeout = Some(t);
            }
            val => {
                if dst_str.is_some() {
                    anyhow::bail!("Argumento inesperado: {} ({})", val, USAGE);
                }
                dst_str = Some(val.to_string());
            }
        }
    }

    let dst = match dst_str {
        Some(s) => s.parse().context("Endereço IP inválido")?,
        None => DEFAULT_DST,
    };

    Ok(PingArgs {
        dst,
        count,
        timeout,
        help: false,
    })
}

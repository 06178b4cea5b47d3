use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::error::ProbeError;

/// Tamanho do cabeçalho IPv4 sem opções, entregue junto com a resposta em sockets RAW.
pub const IP_HEADER_LEN: usize = 20;

/// Tamanho do cabeçalho ICMP (type, code, checksum, identifier, sequence).
pub const ICMP_HEADER_LEN: usize = 8;

/// Tamanho total do Echo Request enviado: cabeçalho + 32 bytes de dados.
pub const ECHO_REQUEST_LEN: usize = 40;

/// Buffer de recepção: cabeçalho IP + mensagem ICMP.
pub const REPLY_BUF_LEN: usize = IP_HEADER_LEN + ECHO_REQUEST_LEN;

/// Identificador fixo para toda a vida do processo.
pub const IDENTIFIER: u16 = 1;

/// Dados de preenchimento (mesmo padrão do ping do Windows).
pub const PAYLOAD: &[u8; ECHO_REQUEST_LEN - ICMP_HEADER_LEN] = b"abcdefghijklmnopqrstuvwabcdefghi";

const ECHO_REQUEST: u8 = 8;

// Offsets dentro do buffer de recepção
const TTL_OFFSET: usize = 8;
const SEQ_OFFSET: usize = IP_HEADER_LEN + 6;

/// Checksum da Internet (RFC 1071): soma em complemento de um das palavras
/// de 16 bits big-endian, com o byte ímpar final completado com zero.
///
/// Exemplo da seção 3 da RFC: `00 01 f2 03 f4 f5 f6 f7` soma `0xddf2`,
/// logo o checksum é `0x220d`. Um buffer que já carrega o próprio checksum
/// resulta em zero.
pub fn checksum(data: &[u8]) -> u16 {
    let words = data.chunks_exact(2);
    let tail = match words.remainder() {
        [last] => (*last as u32) << 8,
        _ => 0,
    };

    let mut sum = words
        .map(|w| u16::from_be_bytes([w[0], w[1]]) as u32)
        .fold(tail, u32::wrapping_add);

    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Monta um Echo Request ICMPv4 (type=8, code=0) de 40 bytes para `seq`.
pub fn build_echo_request(seq: u16) -> [u8; ECHO_REQUEST_LEN] {
    let mut pkt = [0u8; ECHO_REQUEST_LEN];

    // Type=8 (Echo Request), Code=0; checksum fica zerado por enquanto
    pkt[0] = ECHO_REQUEST;
    pkt[1] = 0;

    // Identifier e Sequence (big-endian)
    pkt[4..6].copy_from_slice(&IDENTIFIER.to_be_bytes());
    pkt[6..8].copy_from_slice(&seq.to_be_bytes());

    pkt[ICMP_HEADER_LEN..].copy_from_slice(PAYLOAD);

    // Calcula e escreve o checksum
    let csum = checksum(&pkt);
    pkt[2..4].copy_from_slice(&csum.to_be_bytes());

    pkt
}

/// Uma resposta recebida, pronta para ser exibida.
///
/// O tipo/código ICMP da resposta não é verificado: o próximo datagrama
/// recebido é tratado como a resposta ao último pedido.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoReply {
    pub payload_bytes: usize,
    pub from: Ipv4Addr,
    pub seq: u16,
    pub ttl: u8,
    pub elapsed: Duration,
}

impl EchoReply {
    /// Extrai `ttl` e `sequence` de um datagrama IP bruto.
    pub fn decode(
        buf: &[u8],
        received: usize,
        from: Ipv4Addr,
        elapsed: Duration,
    ) -> Result<Self, ProbeError> {
        let received = received.min(buf.len());
        if received < SEQ_OFFSET + 2 {
            return Err(ProbeError::ShortReply(received));
        }

        Ok(EchoReply {
            payload_bytes: received - IP_HEADER_LEN - ICMP_HEADER_LEN,
            from,
            seq: u16::from_be_bytes([buf[SEQ_OFFSET], buf[SEQ_OFFSET + 1]]),
            ttl: buf[TTL_OFFSET],
            elapsed,
        })
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

impl fmt::Display for EchoReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes from {}: icmp_seq={} ttl={} time={} ms",
            self.payload_bytes,
            self.from,
            self.seq,
            self.ttl,
            sig3(self.elapsed_ms())
        )
    }
}

/// Formata com 3 algarismos significativos, no estilo `%.3g`.
fn sig3(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }

    // O expoente vem da forma científica já arredondada (9.996 -> 1.00e1)
    let sci = format!("{:.2e}", value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if !(-4..3).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        trim_zeros(&format!("{:.*}", (2 - exp) as usize, value)).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Dump hexadecimal da mensagem ICMP contida em `buf` (usado em nível trace).
pub fn hex_dump(buf: &[u8]) -> String {
    buf.iter()
        .skip(IP_HEADER_LEN)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    // Gerador xorshift simples para payloads pseudo-aleatórios
    fn xorshift(state: &mut u32) -> u8 {
        *state ^= *state << 13;
        *state ^= *state >> 17;
        *state ^= *state << 5;
        *state as u8
    }

    fn with_checksum(mut buf: [u8; ECHO_REQUEST_LEN]) -> [u8; ECHO_REQUEST_LEN] {
        buf[2] = 0;
        buf[3] = 0;
        let csum = checksum(&buf);
        buf[2..4].copy_from_slice(&csum.to_be_bytes());
        buf
    }

    #[test]
    fn rfc1071_example() {
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data), 0x220d);
    }

    #[test]
    fn odd_trailing_byte_is_zero_padded() {
        assert_eq!(checksum(&[0xab]), !0xab00);
        assert_eq!(checksum(&[0x12, 0x34, 0x56]), checksum(&[0x12, 0x34, 0x56, 0x00]));
    }

    #[test]
    fn checksummed_buffer_resums_to_zero() {
        let mut state = 0x1234_5678;
        let mut random = [0u8; ECHO_REQUEST_LEN];
        random.iter_mut().for_each(|b| *b = xorshift(&mut state));

        for buf in [[0u8; ECHO_REQUEST_LEN], [0xffu8; ECHO_REQUEST_LEN], random] {
            assert_eq!(checksum(&with_checksum(buf)), 0);
        }
    }

    #[test]
    fn known_request_bytes() {
        let pkt = build_echo_request(1);
        assert_eq!(&pkt[..8], &[8, 0, 0x4d, 0x5a, 0, 1, 0, 1]);
        assert_eq!(&pkt[8..], PAYLOAD);
        assert_eq!(checksum(&pkt), 0);
    }

    #[test]
    fn request_shape_is_constant() {
        for seq in [0, 1, 2, 0x00ff, 0xff00, u16::MAX] {
            let pkt = build_echo_request(seq);
            assert_eq!(pkt.len(), ECHO_REQUEST_LEN);
            assert_eq!(pkt[0], 8);
            assert_eq!(pkt[1], 0);
            assert_eq!(u16::from_be_bytes([pkt[4], pkt[5]]), IDENTIFIER);
            assert_eq!(u16::from_be_bytes([pkt[6], pkt[7]]), seq);
            assert_eq!(checksum(&pkt), 0);
        }
    }

    #[test]
    fn decode_reads_ttl_and_sequence_only() {
        let mut state = 0xdead_beef;
        let mut buf = [0u8; REPLY_BUF_LEN];
        buf.iter_mut().for_each(|b| *b = xorshift(&mut state));
        buf[8] = 57;
        buf[26] = 0x12;
        buf[27] = 0x34;

        let from = Ipv4Addr::new(8, 8, 8, 8);
        let reply = EchoReply::decode(&buf, REPLY_BUF_LEN, from, Duration::ZERO).unwrap();
        assert_eq!(reply.ttl, 57);
        assert_eq!(reply.seq, 0x1234);
        assert_eq!(reply.from, from);
        assert_eq!(reply.payload_bytes, 32);
    }

    #[test]
    fn decode_rejects_short_datagrams() {
        let buf = [0u8; REPLY_BUF_LEN];
        let err = EchoReply::decode(&buf, 27, Ipv4Addr::LOCALHOST, Duration::ZERO).unwrap_err();
        assert!(matches!(err, ProbeError::ShortReply(27)));

        let reply = EchoReply::decode(&buf, 28, Ipv4Addr::LOCALHOST, Duration::ZERO).unwrap();
        assert_eq!(reply.payload_bytes, 0);
    }

    #[test]
    fn report_line_format() {
        let reply = EchoReply {
            payload_bytes: 32,
            from: Ipv4Addr::new(8, 8, 8, 8),
            seq: 1,
            ttl: 56,
            elapsed: Duration::from_micros(14_234),
        };
        assert_eq!(
            reply.to_string(),
            "32 bytes from 8.8.8.8: icmp_seq=1 ttl=56 time=14.2 ms"
        );
    }

    #[test]
    fn three_significant_digits() {
        assert_eq!(sig3(14.234), "14.2");
        assert_eq!(sig3(0.0456), "0.0456");
        assert_eq!(sig3(123.4), "123");
        assert_eq!(sig3(9.996), "10");
        assert_eq!(sig3(1234.5), "1.23e+03");
        assert_eq!(sig3(0.000012), "1.2e-05");
        assert_eq!(sig3(0.0), "0");
    }

    #[test]
    fn hex_dump_skips_ip_header() {
        let mut buf = [0u8; IP_HEADER_LEN + 3];
        buf[IP_HEADER_LEN..].copy_from_slice(&[0x00, 0x0a, 0xff]);
        assert_eq!(hex_dump(&buf), "00 0a ff");
    }
}

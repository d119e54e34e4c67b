// # RFC 2136 DNS Provider
//
// Dynamic DNS UPDATE backend for the DockDNS agent, for authoritative servers
// such as BIND, Knot or PowerDNS.
//
// ## Behavior
//
// - One DNS exchange per trait call; `update` is a delete of the RRset
//   followed by an add
// - Optional TSIG signing (HMAC-SHA256/384/512) with a base64 secret
// - `get` queries the configured server directly; NXDOMAIN and empty answers
//   are `Ok(None)`
// - `list` is a zone transfer over TCP and only reads the first response
//   message; the server must allow AXFR for the key
// - Records carry no comment and no proxy flag
// - REFUSED and NOTAUTH map to authentication errors
//
// ## Trust Level: Untrusted (DNS Provider)
//
// - ✅ Send DNS messages to the configured server only
// - ✅ Run each exchange on the blocking pool and await it in the call
// - ❌ Spawn background tasks
// - ❌ Retry, back off or cache records
// - ❌ Decide whether a write is needed (owned by `SyncEngine`)
//
// ## Security Requirements
//
// - TSIG secret NEVER appears in logs or `Debug` output
// - A TSIG key name without a secret is a configuration error

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use dockdns_core::config::Zone;
use dockdns_core::traits::{DnsProvider, DnsProviderFactory};
use dockdns_core::{Error, ProviderRegistry, Record, RecordType, Result};
use hickory_client::client::{Client, ClientConnection, SyncClient};
use hickory_client::op::ResponseCode;
use hickory_client::proto::rr::dnssec::tsig::TSigner;
use hickory_client::rr::rdata::tsig::TsigAlgorithm;
use hickory_client::rr::rdata::{A, AAAA, CNAME};
use hickory_client::rr::{DNSClass, Name, RData, Record as DnsRecord, RecordType as DnsType};
use hickory_client::tcp::TcpClientConnection;
use hickory_client::udp::UdpClientConnection;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const PROVIDER_NAME: &str = "rfc2136";

const DEFAULT_PORT: u16 = 53;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Allowed clock skew for TSIG signatures, in seconds
const TSIG_FUDGE: u16 = 300;

/// Transport for queries and updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

impl std::str::FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            other => Err(Error::config(format!(
                "Unsupported RFC 2136 protocol '{other}' (expected udp or tcp)"
            ))),
        }
    }
}

/// TSIG key used to sign every message
#[derive(Clone)]
pub struct TsigKey {
    name: Name,
    algorithm: TsigAlgorithm,
    secret: Vec<u8>,
}

impl TsigKey {
    /// Build a key from its name, algorithm name and base64 secret
    pub fn new(name: &str, algorithm: &str, secret: &str) -> Result<Self> {
        let name = fqdn(name)
            .map_err(|e| Error::config(format!("Invalid TSIG key name '{name}': {e}")))?;
        let algorithm = parse_algorithm(algorithm)?;
        let secret = BASE64
            .decode(secret.trim())
            .map_err(|e| Error::config(format!("TSIG secret is not valid base64: {e}")))?;
        if secret.is_empty() {
            return Err(Error::config("TSIG secret cannot be empty"));
        }

        let key = Self {
            name,
            algorithm,
            secret,
        };
        key.signer()?;
        Ok(key)
    }

    fn signer(&self) -> Result<TSigner> {
        TSigner::new(
            self.secret.clone(),
            self.algorithm.clone(),
            self.name.clone(),
            TSIG_FUDGE,
        )
        .map_err(|e| Error::config(format!("Invalid TSIG key '{}': {e}", self.name)))
    }
}

impl std::fmt::Debug for TsigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsigKey")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

fn parse_algorithm(algorithm: &str) -> Result<TsigAlgorithm> {
    match algorithm
        .trim()
        .trim_end_matches('.')
        .to_ascii_lowercase()
        .as_str()
    {
        "" | "hmac-sha256" => Ok(TsigAlgorithm::HmacSha256),
        "hmac-sha384" => Ok(TsigAlgorithm::HmacSha384),
        "hmac-sha512" => Ok(TsigAlgorithm::HmacSha512),
        other => Err(Error::config(format!(
            "Unsupported TSIG algorithm '{other}' (expected hmac-sha256, hmac-sha384 or hmac-sha512)"
        ))),
    }
}

/// Absolute DNS name from a configured name, with or without the root dot
fn fqdn(name: &str) -> std::result::Result<Name, String> {
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() {
        return Err("empty name".to_string());
    }
    Name::from_ascii(format!("{name}.")).map_err(|e| e.to_string())
}

fn display_name(name: &Name) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

fn record_id(name: &str, record_type: RecordType, content: &str) -> String {
    format!("{name}:{record_type}:{content}")
}

/// Build the wire record for a managed record
fn to_dns_record(record: &Record) -> Result<DnsRecord> {
    let name = fqdn(&record.name).map_err(|e| {
        Error::invalid_input(format!("Invalid record name '{}': {e}", record.name))
    })?;

    let content = record.content.trim();
    let rdata = match record.record_type {
        RecordType::A => content
            .parse::<Ipv4Addr>()
            .map(|ip| RData::A(A(ip)))
            .map_err(|e| Error::invalid_input(format!("Invalid IPv4 address '{content}': {e}")))?,
        RecordType::Aaaa => content
            .parse::<Ipv6Addr>()
            .map(|ip| RData::AAAA(AAAA(ip)))
            .map_err(|e| Error::invalid_input(format!("Invalid IPv6 address '{content}': {e}")))?,
        RecordType::Cname => fqdn(content)
            .map(|target| RData::CNAME(CNAME(target)))
            .map_err(|e| Error::invalid_input(format!("Invalid CNAME target '{content}': {e}")))?,
    };

    let mut dns_record = DnsRecord::from_rdata(name, record.ttl, rdata);
    dns_record.set_dns_class(DNSClass::IN);
    Ok(dns_record)
}

/// Convert a wire record; unmanaged types yield `None`
fn from_dns_record(dns_record: &DnsRecord) -> Option<Record> {
    let (record_type, content) = match dns_record.data()? {
        RData::A(a) => (RecordType::A, a.0.to_string()),
        RData::AAAA(aaaa) => (RecordType::Aaaa, aaaa.0.to_string()),
        RData::CNAME(cname) => (RecordType::Cname, display_name(&cname.0)),
        _ => return None,
    };

    let name = display_name(dns_record.name());
    let id = record_id(&name, record_type, &content);
    Some(
        Record::new(name, record_type, content)
            .with_id(id)
            .with_ttl(dns_record.ttl()),
    )
}

fn dns_type(record_type: RecordType) -> DnsType {
    match record_type {
        RecordType::A => DnsType::A,
        RecordType::Aaaa => DnsType::AAAA,
        RecordType::Cname => DnsType::CNAME,
    }
}

/// Map a failed response code to an error
fn response_error(code: ResponseCode, context: &str) -> Error {
    match code {
        ResponseCode::Refused | ResponseCode::NotAuth => {
            Error::auth(format!("{context}: server answered {code}"))
        }
        _ => Error::provider(PROVIDER_NAME, format!("{context}: server answered {code}")),
    }
}

enum Operation {
    Query { name: Name, record_type: DnsType },
    Transfer,
    Append(DnsRecord),
    DeleteRrset(DnsRecord),
    DeleteByRdata(DnsRecord),
}

/// Response code and answers of one exchange
#[derive(Debug)]
struct Reply {
    code: ResponseCode,
    answers: Vec<DnsRecord>,
}

/// Server, zone and key for one provider; shared with the blocking pool
#[derive(Debug)]
struct Target {
    server: String,
    port: u16,
    transport: Transport,
    zone: Name,
    tsig: Option<TsigKey>,
    timeout: Duration,
}

impl Target {
    fn address(&self) -> Result<SocketAddr> {
        if let Ok(ip) = self.server.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        (self.server.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| {
                Error::provider(
                    PROVIDER_NAME,
                    format!("Cannot resolve DNS server '{}': {e}", self.server),
                )
            })?
            .next()
            .ok_or_else(|| {
                Error::provider(
                    PROVIDER_NAME,
                    format!("DNS server '{}' has no address", self.server),
                )
            })
    }

    /// Run one exchange; blocks the calling thread
    fn exchange(&self, operation: Operation) -> Result<Reply> {
        let address = self.address()?;
        let signer = self.tsig.as_ref().map(TsigKey::signer).transpose()?;
        let connect_error = |e: hickory_client::error::ClientError| {
            Error::provider(PROVIDER_NAME, format!("Cannot connect to {address}: {e}"))
        };

        // Zone transfers are TCP only
        let transport = match operation {
            Operation::Transfer => Transport::Tcp,
            _ => self.transport,
        };

        match transport {
            Transport::Udp => {
                let connection =
                    UdpClientConnection::with_timeout(address, self.timeout).map_err(connect_error)?;
                self.run(client(connection, signer), address, operation)
            }
            Transport::Tcp => {
                let connection =
                    TcpClientConnection::with_timeout(address, self.timeout).map_err(connect_error)?;
                self.run(client(connection, signer), address, operation)
            }
        }
    }

    fn run<C: ClientConnection>(
        &self,
        client: SyncClient<C>,
        address: SocketAddr,
        operation: Operation,
    ) -> Result<Reply> {
        let zone = self.zone.clone();
        let response = match operation {
            Operation::Query { name, record_type } => {
                client.query(&name, DNSClass::IN, record_type)
            }
            Operation::Transfer => client.query(&zone, DNSClass::IN, DnsType::AXFR),
            Operation::Append(record) => client.append(record, zone, false),
            Operation::DeleteRrset(record) => client.delete_rrset(record, zone),
            Operation::DeleteByRdata(record) => client.delete_by_rdata(record, zone),
        }
        .map_err(|e| Error::provider(PROVIDER_NAME, format!("DNS exchange with {address} failed: {e}")))?;

        Ok(Reply {
            code: response.response_code(),
            answers: response.answers().to_vec(),
        })
    }
}

fn client<C: ClientConnection>(connection: C, signer: Option<TSigner>) -> SyncClient<C> {
    match signer {
        Some(signer) => SyncClient::with_tsigner(connection, signer),
        None => SyncClient::new(connection),
    }
}

/// RFC 2136 provider for one zone
#[derive(Debug)]
pub struct Rfc2136Provider {
    target: Arc<Target>,
}

impl Rfc2136Provider {
    /// Create a provider
    ///
    /// # Parameters
    ///
    /// - `server`: Primary server host name or IP address
    /// - `port`: Server port, usually 53
    /// - `zone`: Zone to update
    /// - `transport`: UDP or TCP for queries and updates
    /// - `tsig`: Key to sign messages with, if the server requires one
    pub fn new(
        server: impl Into<String>,
        port: u16,
        zone: &str,
        transport: Transport,
        tsig: Option<TsigKey>,
    ) -> Result<Self> {
        let server = server.into();
        if server.trim().is_empty() {
            return Err(Error::config("RFC 2136 provider requires a server"));
        }
        let zone = fqdn(zone).map_err(|e| Error::config(format!("Invalid zone '{zone}': {e}")))?;

        Ok(Self {
            target: Arc::new(Target {
                server: server.trim().to_string(),
                port,
                transport,
                zone,
                tsig,
                timeout: DEFAULT_TIMEOUT,
            }),
        })
    }

    /// Override the per-exchange timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Some(target) = Arc::get_mut(&mut self.target) {
            target.timeout = timeout;
        }
        self
    }

    async fn exchange(&self, operation: Operation) -> Result<Reply> {
        let target = Arc::clone(&self.target);
        tokio::task::spawn_blocking(move || target.exchange(operation))
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("DNS exchange aborted: {e}")))?
    }

    async fn send_update(&self, operation: Operation, context: &str) -> Result<()> {
        let reply = self.exchange(operation).await?;
        if reply.code != ResponseCode::NoError {
            return Err(response_error(reply.code, context));
        }
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for Rfc2136Provider {
    async fn list(&self) -> Result<Vec<Record>> {
        let reply = self.exchange(Operation::Transfer).await?;
        if reply.code != ResponseCode::NoError {
            return Err(response_error(reply.code, "Zone transfer failed"));
        }

        Ok(reply.answers.iter().filter_map(from_dns_record).collect())
    }

    async fn get(&self, name: &str, record_type: RecordType) -> Result<Option<Record>> {
        let query_name =
            fqdn(name).map_err(|e| Error::invalid_input(format!("Invalid name '{name}': {e}")))?;
        let reply = self
            .exchange(Operation::Query {
                name: query_name.clone(),
                record_type: dns_type(record_type),
            })
            .await?;

        match reply.code {
            ResponseCode::NoError => {}
            ResponseCode::NXDomain => return Ok(None),
            code => return Err(response_error(code, &format!("Query for {name} failed"))),
        }

        Ok(reply
            .answers
            .iter()
            .filter(|answer| answer.name() == &query_name)
            .filter_map(from_dns_record)
            .find(|record| record.record_type == record_type))
    }

    async fn create(&self, record: Record) -> Result<Record> {
        let dns_record = to_dns_record(&record)?;
        debug!(name = %record.name, record_type = %record.record_type, "Sending RFC 2136 add");
        self.send_update(
            Operation::Append(dns_record),
            &format!("Adding {} {} failed", record.record_type, record.name),
        )
        .await?;

        let id = record_id(&record.name, record.record_type, &record.content);
        Ok(record.with_id(id).with_comment(String::new()))
    }

    async fn update(&self, record: Record) -> Result<Record> {
        let dns_record = to_dns_record(&record)?;
        debug!(name = %record.name, record_type = %record.record_type, "Replacing RRset via RFC 2136");
        self.send_update(
            Operation::DeleteRrset(dns_record.clone()),
            &format!("Clearing {} {} failed", record.record_type, record.name),
        )
        .await?;
        self.send_update(
            Operation::Append(dns_record),
            &format!("Adding {} {} failed", record.record_type, record.name),
        )
        .await?;

        let id = record_id(&record.name, record.record_type, &record.content);
        Ok(record.with_id(id).with_comment(String::new()))
    }

    async fn delete(&self, record: &Record) -> Result<()> {
        let dns_record = to_dns_record(record)?;
        self.send_update(
            Operation::DeleteByRdata(dns_record),
            &format!("Deleting {} {} failed", record.record_type, record.name),
        )
        .await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for RFC 2136 zones
///
/// Zone settings: `server` (required), `port` (default 53), `protocol`
/// (`udp` or `tcp`, default `udp`), `tsig_name` and `tsig_algorithm`
/// (default `hmac-sha256`). The zone's `api_token` holds the base64 TSIG
/// secret.
pub struct Rfc2136Factory;

impl DnsProviderFactory for Rfc2136Factory {
    fn create(&self, zone: &Zone) -> Result<Box<dyn DnsProvider>> {
        let setting = |key: &str| {
            zone.settings
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let server = setting("server").ok_or_else(|| {
            Error::config(format!("RFC 2136 zone '{}' requires a server", zone.name))
        })?;

        let port = match setting("port") {
            Some(port) => port.parse::<u16>().map_err(|e| {
                Error::config(format!("RFC 2136 zone '{}': invalid port '{port}': {e}", zone.name))
            })?,
            None => DEFAULT_PORT,
        };

        let transport = match setting("protocol") {
            Some(protocol) => protocol.parse::<Transport>()?,
            None => Transport::Udp,
        };

        let secret = zone.api_token.as_deref().filter(|token| !token.is_empty());
        let tsig = match (setting("tsig_name"), secret) {
            (Some(name), Some(secret)) => Some(TsigKey::new(
                name,
                setting("tsig_algorithm").unwrap_or_default(),
                secret,
            )?),
            (Some(_), None) => {
                return Err(Error::config(format!(
                    "RFC 2136 zone '{}' sets tsig_name but has no api_token secret",
                    zone.name
                )));
            }
            (None, _) => None,
        };

        Ok(Box::new(Rfc2136Provider::new(
            server, port, &zone.name, transport, tsig,
        )?))
    }
}

/// Register the RFC 2136 provider with a registry
///
/// # Example
///
/// ```rust
/// use dockdns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dockdns_provider_rfc2136::register(&registry);
/// assert!(registry.has_provider("rfc2136"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(Rfc2136Factory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_client::op::{Message, MessageType};
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::{TcpListener, UdpSocket};
    use std::sync::mpsc;
    use std::thread;

    // "dockdns-test-secret" in base64
    const SECRET: &str = "ZG9ja2Rucy10ZXN0LXNlY3JldA==";

    fn zone(settings: &[(&str, &str)], api_token: Option<&str>) -> Zone {
        Zone {
            id: Some("lan".to_string()),
            provider: PROVIDER_NAME.to_string(),
            name: "example.com".to_string(),
            api_token: api_token.map(str::to_string),
            zone_id: None,
            settings: settings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn a_record(name: &str, ip: &str) -> DnsRecord {
        let mut record = DnsRecord::from_rdata(
            fqdn(name).unwrap(),
            300,
            RData::A(A(ip.parse().unwrap())),
        );
        record.set_dns_class(DNSClass::IN);
        record
    }

    fn reply_to(request: &Message, code: ResponseCode, answers: &[DnsRecord]) -> Vec<u8> {
        let mut reply = request.clone();
        reply.set_message_type(MessageType::Response);
        reply.set_response_code(code);
        reply.add_answers(answers.to_vec());
        reply.to_vec().unwrap()
    }

    /// UDP server answering each request in turn; forwards what it received
    fn udp_server(replies: Vec<(ResponseCode, Vec<DnsRecord>)>) -> (u16, mpsc::Receiver<Message>) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = socket.local_addr().unwrap().port();
        let (seen, received) = mpsc::channel();

        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            for (code, answers) in replies {
                let (len, peer) = socket.recv_from(&mut buf).unwrap();
                let request = Message::from_vec(&buf[..len]).unwrap();
                socket.send_to(&reply_to(&request, code, &answers), peer).unwrap();
                let _ = seen.send(request);
            }
        });

        (port, received)
    }

    /// TCP server answering one length-prefixed request
    fn tcp_server(answers: Vec<DnsRecord>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut len = [0u8; 2];
            stream.read_exact(&mut len).unwrap();
            let mut buf = vec![0u8; u16::from_be_bytes(len) as usize];
            stream.read_exact(&mut buf).unwrap();

            let request = Message::from_vec(&buf).unwrap();
            let reply = reply_to(&request, ResponseCode::NoError, &answers);
            stream.write_all(&(reply.len() as u16).to_be_bytes()).unwrap();
            stream.write_all(&reply).unwrap();
            stream.flush().unwrap();
        });

        port
    }

    fn provider(port: u16, transport: Transport) -> Rfc2136Provider {
        Rfc2136Provider::new("127.0.0.1", port, "example.com", transport, None)
            .unwrap()
            .with_timeout(Duration::from_secs(2))
    }

    #[test]
    fn test_factory_requires_server() {
        let err = Rfc2136Factory.create(&zone(&[], None)).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_factory_defaults() {
        let provider = Rfc2136Factory
            .create(&zone(&[("server", "ns1.example.com")], None))
            .unwrap();
        assert_eq!(provider.provider_name(), "rfc2136");
    }

    #[test]
    fn test_factory_rejects_bad_settings() {
        let bad_port = zone(&[("server", "10.0.0.1"), ("port", "dns")], None);
        assert!(matches!(Rfc2136Factory.create(&bad_port), Err(Error::Config(_))));

        let bad_protocol = zone(&[("server", "10.0.0.1"), ("protocol", "tls")], None);
        assert!(matches!(Rfc2136Factory.create(&bad_protocol), Err(Error::Config(_))));
    }

    #[test]
    fn test_factory_tsig_needs_secret() {
        let without_secret = zone(&[("server", "10.0.0.1"), ("tsig_name", "dockdns-key")], None);
        assert!(matches!(Rfc2136Factory.create(&without_secret), Err(Error::Config(_))));

        let signed = zone(
            &[
                ("server", "10.0.0.1"),
                ("protocol", "TCP"),
                ("tsig_name", "dockdns-key"),
                ("tsig_algorithm", "hmac-sha512"),
            ],
            Some(SECRET),
        );
        assert!(Rfc2136Factory.create(&signed).is_ok());
    }

    #[test]
    fn test_tsig_key_validation() {
        assert!(TsigKey::new("dockdns-key", "hmac-sha256.", SECRET).is_ok());
        assert!(matches!(
            TsigKey::new("dockdns-key", "hmac-md5", SECRET),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TsigKey::new("dockdns-key", "", "not base64!"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_tsig_secret_is_redacted() {
        let key = TsigKey::new("dockdns-key", "", SECRET).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(SECRET));
    }

    #[test]
    fn test_record_conversion() {
        let record = Record::new("app.example.com", RecordType::Cname, "host.example.com")
            .with_ttl(120);
        let dns_record = to_dns_record(&record).unwrap();
        assert_eq!(dns_record.record_type(), DnsType::CNAME);
        assert_eq!(dns_record.name().to_string(), "app.example.com.");

        let back = from_dns_record(&dns_record).unwrap();
        assert_eq!(back.name, "app.example.com");
        assert_eq!(back.content, "host.example.com");
        assert_eq!(back.ttl, 120);
        assert_eq!(back.id, "app.example.com:CNAME:host.example.com");
    }

    #[test]
    fn test_invalid_content_is_rejected() {
        let record = Record::new("app.example.com", RecordType::A, "2001:db8::1");
        assert!(matches!(to_dns_record(&record), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_refused_is_an_auth_error() {
        assert!(matches!(
            response_error(ResponseCode::Refused, "update"),
            Error::Authentication(_)
        ));
        assert!(matches!(
            response_error(ResponseCode::ServFail, "update"),
            Error::Provider { .. }
        ));
    }

    #[tokio::test]
    async fn test_create_sends_update() {
        let (port, seen) = udp_server(vec![(ResponseCode::NoError, vec![])]);

        let record = Record::new("app.example.com", RecordType::A, "203.0.113.7").with_ttl(300);
        let created = provider(port, Transport::Udp).create(record).await.unwrap();
        assert_eq!(created.id, "app.example.com:A:203.0.113.7");

        let request = seen.recv().unwrap();
        assert_eq!(request.name_servers().len(), 1);
        let update = &request.name_servers()[0];
        assert_eq!(update.name().to_string(), "app.example.com.");
        assert_eq!(update.record_type(), DnsType::A);
    }

    #[tokio::test]
    async fn test_update_replaces_rrset() {
        let (port, seen) = udp_server(vec![
            (ResponseCode::NoError, vec![]),
            (ResponseCode::NoError, vec![]),
        ]);

        let record = Record::new("app.example.com", RecordType::A, "203.0.113.8")
            .with_id("app.example.com:A:203.0.113.7")
            .with_ttl(300);
        let updated = provider(port, Transport::Udp).update(record).await.unwrap();
        assert_eq!(updated.id, "app.example.com:A:203.0.113.8");

        let clear = seen.recv().unwrap();
        assert_eq!(clear.name_servers()[0].dns_class(), DNSClass::ANY);
        let add = seen.recv().unwrap();
        assert_eq!(add.name_servers()[0].dns_class(), DNSClass::IN);
    }

    #[tokio::test]
    async fn test_get_finds_record() {
        let (port, _seen) = udp_server(vec![(
            ResponseCode::NoError,
            vec![a_record("app.example.com", "203.0.113.7")],
        )]);

        let record = provider(port, Transport::Udp)
            .get("app.example.com", RecordType::A)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.content, "203.0.113.7");
        assert!(record.exists());
    }

    #[tokio::test]
    async fn test_get_empty_answer_is_none() {
        let (port, _seen) = udp_server(vec![(ResponseCode::NoError, vec![])]);

        let record = provider(port, Transport::Udp)
            .get("missing.example.com", RecordType::Aaaa)
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_refused_update_fails() {
        let (port, _seen) = udp_server(vec![(ResponseCode::Refused, vec![])]);

        let record = Record::new("app.example.com", RecordType::A, "203.0.113.7");
        let err = provider(port, Transport::Udp)
            .delete(&record)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[tokio::test]
    async fn test_list_transfers_zone_over_tcp() {
        let port = tcp_server(vec![
            a_record("app.example.com", "203.0.113.7"),
            a_record("db.example.com", "203.0.113.9"),
        ]);

        let records = provider(port, Transport::Udp).list().await.unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["app.example.com", "db.example.com"]);
    }

    #[test]
    fn test_register() {
        let registry = ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_provider("rfc2136"));
    }
}

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use mailparse::{MailHeaderMap, ParsedMail, parse_mail};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::models::FetchedEmail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapProvider {
    pub host: String,
    pub port: u16,
}

impl ImapProvider {
    fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: 993,
        }
    }
}

const DOMAIN_ALIASES: &[(&str, &str)] = &[("yahoo.co.uk", "yahoo.com"), ("yahoo.ca", "yahoo.com")];

const KNOWN_PROVIDERS: &[(&str, &str)] = &[
    ("gmail.com", "imap.gmail.com"),
    ("googlemail.com", "imap.gmail.com"),
    ("outlook.com", "outlook.office365.com"),
    ("hotmail.com", "outlook.office365.com"),
    ("live.com", "outlook.office365.com"),
    ("msn.com", "outlook.office365.com"),
    ("yahoo.com", "imap.mail.yahoo.com"),
    ("yahoo.fr", "imap.mail.yahoo.com"),
    ("icloud.com", "imap.mail.me.com"),
    ("me.com", "imap.mail.me.com"),
    ("mac.com", "imap.mail.me.com"),
];

/// IMAP endpoint for an address, by its domain; unknown domains get
/// `imap.<domain>`.
pub fn detect_provider(address: &str) -> Result<ImapProvider> {
    let (_, domain) = address
        .rsplit_once('@')
        .ok_or_else(|| anyhow!("Invalid email address: {}", address))?;
    let domain = domain.trim().to_lowercase();

    let domain = DOMAIN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == domain)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(domain);

    Ok(KNOWN_PROVIDERS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, host)| ImapProvider::new(host))
        .unwrap_or_else(|| ImapProvider::new(&format!("imap.{}", domain))))
}

pub struct EmailConfig {
    pub provider: ImapProvider,
    pub username: String,
    pub password: String,
    pub folder: String,
}

impl EmailConfig {
    pub fn new(username: &str, password: &str, folder: &str) -> Result<Self> {
        Ok(Self {
            provider: detect_provider(username)?,
            username: username.to_string(),
            password: password.trim().to_string(),
            folder: folder.to_string(),
        })
    }

    pub fn from_password_file(username: &str, password_file: &Path, folder: &str) -> Result<Self> {
        let password = fs::read_to_string(password_file)
            .with_context(|| format!("Failed to read password file: {:?}", password_file))?;
        Self::new(username, &password, folder)
    }
}

/// Pulls recent alert emails over IMAP. Its only output is the list of
/// `FetchedEmail`s; parsing happens elsewhere.
pub struct EmailFetcher {
    config: EmailConfig,
}

impl EmailFetcher {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn fetch_recent(&self, days_back: u32, sender_filter: Option<&str>) -> Result<Vec<FetchedEmail>> {
        let tls = native_tls::TlsConnector::builder().build()?;

        let host = self.config.provider.host.as_str();
        let addr = (host, self.config.provider.port);
        let tcp = std::net::TcpStream::connect(addr).context("Failed to connect to IMAP server")?;
        tcp.set_read_timeout(Some(std::time::Duration::from_secs(30)))?;
        tcp.set_write_timeout(Some(std::time::Duration::from_secs(30)))?;
        let tls_stream = tls.connect(host, tcp)?;

        let client = imap::Client::new(tls_stream);
        let mut session = client
            .login(&self.config.username, &self.config.password)
            .map_err(|e| anyhow!("Login failed: {}", e.0))?;

        session.select(&self.config.folder)?;

        let now = Utc::now();
        let mut query = format!("SINCE {}", since_query(now, days_back));
        if let Some(sender) = sender_filter {
            query.push_str(&format!(" FROM \"{}\"", sender));
        }

        let mut uids: Vec<u32> = session.uid_search(&query)?.into_iter().collect();
        uids.sort_unstable();
        info!(folder = %self.config.folder, count = uids.len(), "Found candidate emails");

        let mut emails = Vec::new();
        for uid in uids {
            let messages = session.uid_fetch(uid.to_string(), "RFC822")?;
            for message in messages.iter() {
                let Some(body) = message.body() else {
                    continue;
                };
                match parse_fetched(uid, body) {
                    Ok(Some(email)) if is_recent_enough(&email, now, days_back) => emails.push(email),
                    Ok(_) => debug!(uid, "Skipping email without HTML, date or outside window"),
                    Err(e) => warn!(uid, error = %e, "Failed to decode email"),
                }
            }
        }

        session.logout()?;
        Ok(emails)
    }
}

/// IMAP `SINCE` date, `DD-Mon-YYYY`.
fn since_query(now: DateTime<Utc>, days_back: u32) -> String {
    (now - Duration::days(days_back as i64)).format("%d-%b-%Y").to_string()
}

fn is_recent_enough(email: &FetchedEmail, now: DateTime<Utc>, days_back: u32) -> bool {
    email.received_at >= now - Duration::days(days_back as i64)
}

/// Decode one RFC822 message. `Ok(None)` when it has no non-blank HTML part
/// or no usable `Date` header.
pub fn parse_fetched(uid: u32, raw: &[u8]) -> Result<Option<FetchedEmail>> {
    let parsed = parse_mail(raw)?;

    let Some(html) = find_html_part(&parsed)?.filter(|html| !html.trim().is_empty()) else {
        return Ok(None);
    };

    let Some(date) = parsed.headers.get_first_value("Date") else {
        return Ok(None);
    };
    let Some(received_at) = mailparse::dateparse(&date)
        .ok()
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
    else {
        warn!(uid, date = %date, "Unparsable Date header");
        return Ok(None);
    };

    let mut headers = BTreeMap::new();
    for header in &parsed.headers {
        headers.entry(header.get_key()).or_insert_with(|| header.get_value());
    }

    Ok(Some(FetchedEmail {
        uid,
        sender: parsed.headers.get_first_value("From").unwrap_or_default(),
        subject: parsed.headers.get_first_value("Subject").unwrap_or_default(),
        received_at,
        html,
        headers,
    }))
}

/// Depth-first search for the first `text/html` part.
fn find_html_part(part: &ParsedMail) -> Result<Option<String>> {
    if part.subparts.is_empty() {
        if part.ctype.mimetype.eq_ignore_ascii_case("text/html") {
            return Ok(Some(part.get_body()?));
        }
        return Ok(None);
    }

    for sub in &part.subparts {
        if let Some(html) = find_html_part(sub)? {
            return Ok(Some(html));
        }
    }
    Ok(None)
}

/// Read a saved `.eml` file as if it had been fetched.
pub fn load_eml(path: &Path, uid: u32) -> Result<Option<FetchedEmail>> {
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_fetched(uid, &raw)
}

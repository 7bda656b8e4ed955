//! Origin ASN lookup through Team Cymru's DNS service.
//!
//! A TXT query for `<reversed octets>.origin.asn.cymru.com` answers with
//! `"15169 | 8.8.8.0/24 | US | arin | 2000-03-30"`.

use crate::RegistryError;
use hickory_resolver::TokioResolver;
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::trace;

const ORIGIN_ZONE: &str = "origin.asn.cymru.com.";

/// Regional internet registries that serve RDAP for IPv4 space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rir {
    Arin,
    RipeNcc,
    Apnic,
    Lacnic,
    Afrinic,
}

impl Rir {
    /// Base URL of the registry's RDAP `ip` endpoint.
    pub fn rdap_base(&self) -> &'static str {
        match self {
            Rir::Arin => "https://rdap.arin.net/registry/ip/",
            Rir::RipeNcc => "https://rdap.db.ripe.net/ip/",
            Rir::Apnic => "https://rdap.apnic.net/ip/",
            Rir::Lacnic => "https://rdap.lacnic.net/rdap/ip/",
            Rir::Afrinic => "https://rdap.afrinic.net/rdap/ip/",
        }
    }
}

impl FromStr for Rir {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arin" => Ok(Rir::Arin),
            "ripencc" => Ok(Rir::RipeNcc),
            "apnic" => Ok(Rir::Apnic),
            "lacnic" => Ok(Rir::Lacnic),
            "afrinic" => Ok(Rir::Afrinic),
            other => Err(RegistryError::AsnRegistry(format!(
                "unknown registry {other:?}"
            ))),
        }
    }
}

/// One origin record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsnRecord {
    /// Origin AS number(s) as published; several are space separated.
    pub asn: String,
    /// Announced prefix, e.g. `8.8.8.0/24`.
    pub prefix: String,
    /// Country code of the allocation, possibly empty.
    pub country: String,
    pub registry: Rir,
}

/// Builds the fully-qualified TXT query name for `ip`.
pub fn origin_query_name(ip: Ipv4Addr) -> String {
    let [a, b, c, d] = ip.octets();
    format!("{d}.{c}.{b}.{a}.{ORIGIN_ZONE}")
}

/// Parses one origin TXT record.
pub fn parse_origin_txt(txt: &str) -> Result<AsnRecord, RegistryError> {
    let fields: Vec<&str> = txt.split('|').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(RegistryError::AsnRegistry(format!(
            "unexpected origin record {txt:?}"
        )));
    }

    Ok(AsnRecord {
        asn: fields[0].to_string(),
        prefix: fields[1].to_string(),
        country: fields[2].to_uppercase(),
        registry: fields[3].parse()?,
    })
}

/// Looks up the origin record for `ip`.
pub async fn lookup_origin(
    resolver: &TokioResolver,
    ip: Ipv4Addr,
) -> Result<AsnRecord, RegistryError> {
    let name = origin_query_name(ip);
    trace!(query = %name, "Querying origin ASN");

    let lookup = resolver
        .txt_lookup(name.as_str())
        .await
        .map_err(|e| RegistryError::AsnRegistry(format!("ASN lookup failed for {ip}: {e}")))?;

    let record = lookup.iter().next().ok_or_else(|| {
        RegistryError::AsnRegistry(format!("ASN lookup returned no records for {ip}"))
    })?;

    let txt: String = record
        .txt_data()
        .iter()
        .map(|chunk| String::from_utf8_lossy(chunk))
        .collect();

    parse_origin_txt(&txt)
}

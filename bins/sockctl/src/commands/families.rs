//! sockctl families command implementation.
//!
//! Lists the native registry entries in lookup order, then the proxy.

use std::io::Write;

use clap::Args;
use sockif::socket::{Backend, NativeEntry, ProtocolMatch, Registry, Result};

use crate::output::{OutputFormat, OutputOptions, Printable, print_all};

#[derive(Args)]
pub struct FamiliesCmd {}

/// One row of the listing.
#[derive(Debug)]
struct FamilyInfo {
    domain: Option<String>,
    types: Vec<String>,
    protocol: Option<i32>,
    backend: &'static str,
    kind: &'static str,
}

impl FamilyInfo {
    fn native(entry: &NativeEntry) -> Self {
        let protocol = match entry.protocol() {
            ProtocolMatch::Any => None,
            ProtocolMatch::Exact(p) => Some(p),
        };
        Self {
            domain: Some(entry.domain().to_string()),
            types: entry.types().iter().map(|t| t.to_string()).collect(),
            protocol,
            backend: entry.backend().name(),
            kind: entry.backend().kind().as_str(),
        }
    }

    fn proxy(backend: &Backend) -> Self {
        Self {
            domain: None,
            types: Vec::new(),
            protocol: None,
            backend: backend.name(),
            kind: backend.kind().as_str(),
        }
    }
}

impl Printable for FamilyInfo {
    fn print_text<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let types = if self.types.is_empty() {
            "any".to_string()
        } else {
            self.types.join(",")
        };
        let protocol = self
            .protocol
            .map_or_else(|| "any".to_string(), |p| p.to_string());

        writeln!(
            w,
            "{:<10} type {:<16} proto {:<5} backend {} ({})",
            self.domain.as_deref().unwrap_or("*"),
            types,
            protocol,
            self.backend,
            self.kind
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "domain": self.domain,
            "types": self.types,
            "protocol": self.protocol,
            "backend": self.backend,
            "kind": self.kind,
        })
    }
}

fn collect(registry: &Registry) -> Vec<FamilyInfo> {
    let mut rows: Vec<FamilyInfo> = registry.entries().map(FamilyInfo::native).collect();
    if let Some(proxy) = registry.proxy() {
        rows.push(FamilyInfo::proxy(proxy));
    }
    rows
}

impl FamiliesCmd {
    pub fn run(&self, registry: &Registry, format: OutputFormat, opts: &OutputOptions) -> Result<()> {
        let rows = collect(registry);
        if rows.is_empty() && format == OutputFormat::Text {
            tracing::warn!("no socket backends configured");
        }
        print_all(&rows, format, opts)?;
        Ok(())
    }
}

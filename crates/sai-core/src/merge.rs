//! Per-field override-merge resolution.
//!
//! spec.md §3's override rule is per-field, not per-record: a provider
//! override that sets only one field of an array entry must still inherit
//! every other field from the top-level entry at the same position. This
//! module lifts that rule into a single `MergedView` so every template
//! helper (in `sai-template`) resolves fields the same way instead of each
//! helper re-implementing the walk.

use crate::binary::BinaryRecord;
use crate::saidata::{CommandEntry, Container, Directory, FileEntry, Package, Port, Saidata, Service};
use crate::script::ScriptRecord;
use crate::source::SourceRecord;

/// A read-only, provider-scoped view over a `Saidata` record implementing
/// the override-then-base-then-default field resolution.
pub struct MergedView<'a> {
    saidata: &'a Saidata,
    provider: &'a str,
}

impl<'a> MergedView<'a> {
    pub fn new(saidata: &'a Saidata, provider: &'a str) -> Self {
        Self { saidata, provider }
    }

    fn override_config(&self) -> Option<&'a crate::saidata::ProviderConfig> {
        self.saidata.providers.get(self.provider)
    }

    /// Package at index `i`, merging the provider override entry (if any)
    /// over the base entry (if any) at the same index, field by field.
    pub fn package(&self, i: usize) -> Option<Package> {
        let base = self.saidata.packages.get(i);
        let over = self.override_config().and_then(|c| c.packages.get(i));
        merge_entry(over, base, |o, b| Package {
            name: pick_string(o.map(|p| &p.name), b.map(|p| &p.name)).unwrap_or_default(),
            package_name: pick_opt(o.and_then(|p| p.package_name.as_ref()), b.and_then(|p| p.package_name.as_ref())),
            version: pick_opt(o.and_then(|p| p.version.as_ref()), b.and_then(|p| p.version.as_ref())),
        })
    }

    pub fn package_count(&self) -> usize {
        let base_len = self.saidata.packages.len();
        let over_len = self.override_config().map(|c| c.packages.len()).unwrap_or(0);
        base_len.max(over_len)
    }

    pub fn packages(&self) -> Vec<Package> {
        (0..self.package_count()).filter_map(|i| self.package(i)).collect()
    }

    pub fn service(&self, i: usize) -> Option<Service> {
        let base = self.saidata.services.get(i);
        let over = self.override_config().and_then(|c| c.services.get(i));
        merge_entry(over, base, |o, b| Service {
            name: pick_string(o.map(|s| &s.name), b.map(|s| &s.name)).unwrap_or_default(),
            service_name: pick_opt(o.and_then(|s| s.service_name.as_ref()), b.and_then(|s| s.service_name.as_ref())),
            service_type: pick_opt(o.and_then(|s| s.service_type.as_ref()), b.and_then(|s| s.service_type.as_ref())),
        })
    }

    fn find_by_name<'x, T>(items: &'x [T], name: &str, name_of: impl Fn(&T) -> &str) -> Option<&'x T> {
        items.iter().find(|item| name_of(item) == name)
    }

    /// Service lookup by logical name, merging override over base. Used by
    /// the single-argument form of the `sai_service` helper.
    pub fn service_by_name(&self, name: &str) -> Option<Service> {
        let base = Self::find_by_name(&self.saidata.services, name, |s| &s.name);
        let over = self
            .override_config()
            .and_then(|c| Self::find_by_name(&c.services, name, |s| &s.name));
        merge_entry(over, base, |o, b| Service {
            name: name.to_string(),
            service_name: pick_opt(o.and_then(|s| s.service_name.as_ref()), b.and_then(|s| s.service_name.as_ref())),
            service_type: pick_opt(o.and_then(|s| s.service_type.as_ref()), b.and_then(|s| s.service_type.as_ref())),
        })
    }

    /// Container lookup by logical name, merging override over base. Used
    /// by the single-argument form of the `sai_container` helper.
    pub fn container_by_name(&self, name: &str) -> Option<Container> {
        let base = Self::find_by_name(&self.saidata.containers, name, |c| &c.name);
        let over = self
            .override_config()
            .and_then(|c| Self::find_by_name(&c.containers, name, |c| &c.name));
        merge_entry(over, base, |o, b| Container {
            name: name.to_string(),
            image: pick_string(o.map(|c| &c.image), b.map(|c| &c.image)).unwrap_or_default(),
            tag: pick_opt(o.and_then(|c| c.tag.as_ref()), b.and_then(|c| c.tag.as_ref())),
            registry: pick_opt(o.and_then(|c| c.registry.as_ref()), b.and_then(|c| c.registry.as_ref())),
        })
    }

    /// File lookup by logical name, merging override over base.
    pub fn file(&self, name: &str) -> Option<FileEntry> {
        let base = Self::find_by_name(&self.saidata.files, name, |f| &f.name);
        let over = self
            .override_config()
            .and_then(|c| Self::find_by_name(&c.files, name, |f| &f.name));
        merge_entry(over, base, |o, b| FileEntry {
            name: name.to_string(),
            path: pick_string(o.map(|f| &f.path), b.map(|f| &f.path)).unwrap_or_default(),
            file_type: pick_opt(o.and_then(|f| f.file_type.as_ref()), b.and_then(|f| f.file_type.as_ref())),
        })
    }

    pub fn directory(&self, name: &str) -> Option<Directory> {
        let base = Self::find_by_name(&self.saidata.directories, name, |d| &d.name);
        let over = self
            .override_config()
            .and_then(|c| Self::find_by_name(&c.directories, name, |d| &d.name));
        merge_entry(over, base, |o, b| Directory {
            name: name.to_string(),
            path: pick_string(o.map(|d| &d.path), b.map(|d| &d.path)).unwrap_or_default(),
        })
    }

    pub fn command(&self, name: &str) -> Option<CommandEntry> {
        let base = Self::find_by_name(&self.saidata.commands, name, |c| &c.name);
        let over = self
            .override_config()
            .and_then(|c| Self::find_by_name(&c.commands, name, |c| &c.name));
        merge_entry(over, base, |o, b| CommandEntry {
            name: name.to_string(),
            path: pick_opt(o.and_then(|c| c.path.as_ref()), b.and_then(|c| c.path.as_ref())),
        })
    }

    pub fn port(&self, i: usize) -> Option<Port> {
        let base = self.saidata.ports.get(i);
        let over = self.override_config().and_then(|c| c.ports.get(i));
        merge_entry(over, base, |o, b| Port {
            port: o.map(|p| p.port).or(b.map(|p| p.port)).unwrap_or(0),
            protocol: pick_opt(o.and_then(|p| p.protocol.as_ref()), b.and_then(|p| p.protocol.as_ref())),
            service: pick_opt(o.and_then(|p| p.service.as_ref()), b.and_then(|p| p.service.as_ref())),
        })
    }

    pub fn container(&self, i: usize) -> Option<Container> {
        let base = self.saidata.containers.get(i);
        let over = self.override_config().and_then(|c| c.containers.get(i));
        merge_entry(over, base, |o, b| Container {
            name: pick_string(o.map(|c| &c.name), b.map(|c| &c.name)).unwrap_or_default(),
            image: pick_string(o.map(|c| &c.image), b.map(|c| &c.image)).unwrap_or_default(),
            tag: pick_opt(o.and_then(|c| c.tag.as_ref()), b.and_then(|c| c.tag.as_ref())),
            registry: pick_opt(o.and_then(|c| c.registry.as_ref()), b.and_then(|c| c.registry.as_ref())),
        })
    }

    /// Source records are not field-merged: the override entry, if present
    /// at index `i`, replaces the base entry wholesale (they carry too many
    /// interdependent fields — `build_dir`/`source_dir`/`build_system` — to
    /// merge safely field by field), falling back to the base entry
    /// otherwise.
    pub fn source(&self, i: usize) -> Option<&SourceRecord> {
        self.override_config()
            .and_then(|c| c.sources.get(i))
            .or_else(|| self.saidata.sources.get(i))
    }

    pub fn binary(&self, i: usize) -> Option<&BinaryRecord> {
        self.override_config()
            .and_then(|c| c.binaries.get(i))
            .or_else(|| self.saidata.binaries.get(i))
    }

    pub fn script(&self, i: usize) -> Option<&ScriptRecord> {
        self.override_config()
            .and_then(|c| c.scripts.get(i))
            .or_else(|| self.saidata.scripts.get(i))
    }
}

fn merge_entry<T, O>(over: Option<&O>, base: Option<&O>, build: impl Fn(Option<&O>, Option<&O>) -> T) -> Option<T> {
    if over.is_none() && base.is_none() {
        None
    } else {
        Some(build(over, base))
    }
}

fn pick_opt(over: Option<&String>, base: Option<&String>) -> Option<String> {
    over.or(base).cloned()
}

fn pick_string(over: Option<&String>, base: Option<&String>) -> Option<String> {
    over.filter(|s| !s.is_empty()).or(base).cloned()
}

// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::sync::atomic::{AtomicU64, Ordering};

use emberdb_type::{Domain, DomainId, DomainProvider};
use parking_lot::RwLock;

/// The domain registry: the ten builtins plus registered derived domains
/// (arrays, multisets, row shapes).
///
/// Registration deduplicates structurally, so registering the same array
/// domain twice hands back the same id and `matches` on cast nodes keeps
/// working across compiled units.
pub struct StandardDomains {
	derived: RwLock<Vec<(DomainId, Domain)>>,
	next: AtomicU64,
}

impl Default for StandardDomains {
	fn default() -> Self {
		Self::new()
	}
}

impl StandardDomains {
	pub fn new() -> Self {
		Self {
			derived: RwLock::new(Vec::new()),
			next: AtomicU64::new(DomainId::FIRST_DERIVED.0),
		}
	}

	/// Register a derived domain, reusing the id of a structurally equal
	/// one when it exists.
	pub fn register(&self, domain: Domain) -> DomainId {
		{
			let derived = self.derived.read();
			if let Some((id, _)) = derived
				.iter()
				.find(|(_, seen)| *seen == domain)
			{
				return *id;
			}
		}
		let mut derived = self.derived.write();
		// racing registrations may have landed it first
		if let Some((id, _)) =
			derived.iter().find(|(_, seen)| *seen == domain)
		{
			return *id;
		}
		let id = DomainId(self.next.fetch_add(1, Ordering::Relaxed));
		derived.push((id, domain));
		id
	}

	pub fn len(&self) -> usize {
		self.derived.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.derived.read().is_empty()
	}
}

impl DomainProvider for StandardDomains {
	fn lookup(&self, id: DomainId) -> Option<Domain> {
		if id.is_builtin() {
			return Domain::builtin(id);
		}
		self.derived
			.read()
			.iter()
			.find(|(seen, _)| *seen == id)
			.map(|(_, domain)| domain.clone())
	}
}

#[cfg(test)]
mod tests {
	use emberdb_type::DomainKind;

	use super::*;

	#[test]
	fn test_builtins_resolve() {
		let domains = StandardDomains::new();
		let integer = domains.lookup(DomainId::INTEGER).unwrap();
		assert_eq!(integer.kind(), DomainKind::Integer);
		assert!(domains.lookup(DomainId(99)).is_none());
	}

	#[test]
	fn test_register_deduplicates() {
		let domains = StandardDomains::new();
		let a = domains.register(Domain::array_of(DomainId::INTEGER));
		let b = domains.register(Domain::array_of(DomainId::INTEGER));
		let c = domains.register(Domain::array_of(DomainId::REAL));
		assert_eq!(a, b);
		assert_ne!(a, c);
		assert!(a.0 >= DomainId::FIRST_DERIVED.0);
		assert_eq!(domains.len(), 2);
	}

	#[test]
	fn test_derived_lookup() {
		let domains = StandardDomains::new();
		let id =
			domains.register(Domain::multiset_of(DomainId::DATE));
		let domain = domains.lookup(id).unwrap();
		assert_eq!(domain.kind(), DomainKind::Multiset);
		assert_eq!(domain.element(), Some(DomainId::DATE));
	}
}

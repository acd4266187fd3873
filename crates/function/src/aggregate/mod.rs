// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Aggregate registers.
//!
//! A [`Register`] folds one aggregate over a stream of inputs. It starts
//! at the identity for its function, accumulates with [`Register::add_in`]
//! (or [`Register::add_row`] for `COUNT(*)`), and produces its result with
//! [`Register::finalize`]. Finalizing is idempotent; adding afterwards is
//! a programming error.
//!
//! [`RegisterSet`] keys registers by grouping values so that a single
//! pass over the input feeds every group, in first-seen group order.

mod sum;

use std::cmp::Ordering;

use emberdb_core::NodeId;
use emberdb_core::graph::FunctionKind;
use emberdb_type::error::diagnostic::{arithmetic, internal, runtime};
use emberdb_type::{Error, Fragment, Multiset, Result, Value, domain::arith};
use indexmap::IndexMap;

pub use sum::SumAcc;

/// Where a register is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterState {
	/// No input seen yet; finalizing yields the identity.
	Empty,
	/// At least one input folded in.
	Accumulating,
	/// The result has been computed and is now frozen.
	Finalized(Value),
}

/// One aggregate in flight.
///
/// Only the fields for the register's own kind are ever touched; the rest
/// stay at their identity. NULL and still-pending inputs are skipped, so
/// `COUNT(expr)` counts non-null values while `COUNT(*)` counts rows.
#[derive(Debug, Clone)]
pub struct Register {
	kind: FunctionKind,
	distinct: bool,
	state: RegisterState,
	count: u64,
	sum: SumAcc,
	extreme: Value,
	bval: bool,
	seen: Multiset,
	mset: Option<Multiset>,
	items: Vec<Value>,
	sum1: f64,
	sum_squares: f64,
}

impl Register {
	pub fn start(kind: FunctionKind, distinct: bool) -> Self {
		Self {
			kind,
			distinct,
			state: RegisterState::Empty,
			count: 0,
			sum: SumAcc::Unset,
			extreme: Value::Null,
			// EVERY starts true, ANY starts false
			bval: matches!(kind, FunctionKind::Every),
			seen: Multiset::new(),
			mset: None,
			items: Vec::new(),
			sum1: 0.0,
			sum_squares: 0.0,
		}
	}

	pub fn kind(&self) -> FunctionKind {
		self.kind
	}

	pub fn state(&self) -> &RegisterState {
		&self.state
	}

	pub fn count(&self) -> u64 {
		self.count
	}

	/// Count a bare row, as `COUNT(*)` does.
	pub fn add_row(&mut self) -> Result<()> {
		if matches!(self.state, RegisterState::Finalized(_)) {
			return Err(Error(internal::internal(
				"aggregate register fed after finalize",
			)));
		}
		self.state = RegisterState::Accumulating;
		self.count += 1;
		Ok(())
	}

	/// Fold one value into the register.
	pub fn add_in(
		&mut self,
		value: &Value,
		fragment: &Fragment,
	) -> Result<()> {
		if matches!(self.state, RegisterState::Finalized(_)) {
			return Err(Error(internal::internal(
				"aggregate register fed after finalize",
			)));
		}
		if matches!(value, Value::Null | Value::Pending) {
			return Ok(());
		}
		if self.distinct {
			if self.seen.contains(value) {
				return Ok(());
			}
			self.seen.insert(value.clone());
		}
		self.state = RegisterState::Accumulating;
		match self.kind {
			FunctionKind::Count => {
				self.count += 1;
			}
			FunctionKind::Sum => {
				self.sum.add(value, fragment)?;
			}
			FunctionKind::Avg => {
				self.sum.add(value, fragment)?;
				self.count += 1;
			}
			FunctionKind::Min => {
				self.take_extreme(
					value,
					Ordering::Less,
					fragment,
				)?;
			}
			FunctionKind::Max => {
				self.take_extreme(
					value,
					Ordering::Greater,
					fragment,
				)?;
			}
			FunctionKind::Every => {
				let b = self.expect_boolean(value, fragment)?;
				self.bval &= b;
			}
			FunctionKind::Any => {
				let b = self.expect_boolean(value, fragment)?;
				self.bval |= b;
			}
			FunctionKind::Collect => {
				self.mset
					.get_or_insert_with(Multiset::new)
					.insert(value.clone());
			}
			FunctionKind::Fusion => {
				let input =
					self.expect_multiset(value, fragment)?;
				self.mset = Some(match self.mset.take() {
					Some(acc) => acc.fuse(input),
					None => input.clone(),
				});
			}
			FunctionKind::Intersection => {
				let input =
					self.expect_multiset(value, fragment)?;
				self.mset = Some(match self.mset.take() {
					Some(acc) => acc.intersect(input),
					None => input.clone(),
				});
			}
			FunctionKind::ArrayAgg => {
				self.items.push(value.clone());
			}
			FunctionKind::StdDevPop
			| FunctionKind::StdDevSamp => {
				let v = match value.to_f64() {
					Some(v) => v,
					None => {
						return Err(Error(
							arithmetic::unsupported_operand(
								fragment.clone(),
								&self.kind.to_string(),
								value.kind(),
							),
						));
					}
				};
				self.count += 1;
				self.sum1 += v;
				self.sum_squares += v * v;
			}
			other => {
				return Err(Error(internal::internal(format!(
					"{} is not a register aggregate",
					other
				))));
			}
		}
		Ok(())
	}

	/// Compute the result, freezing the register. Calling again returns
	/// the same value.
	pub fn finalize(&mut self, fragment: &Fragment) -> Result<Value> {
		if let RegisterState::Finalized(value) = &self.state {
			return Ok(value.clone());
		}
		let value = match self.kind {
			FunctionKind::Count => Value::Int(self.count as i64),
			FunctionKind::Sum => self.sum.value(),
			FunctionKind::Avg => self.sum.average(self.count),
			FunctionKind::Min | FunctionKind::Max => {
				self.extreme.clone()
			}
			FunctionKind::Every | FunctionKind::Any => {
				Value::Boolean(self.bval)
			}
			FunctionKind::Collect
			| FunctionKind::Fusion
			| FunctionKind::Intersection => Value::multiset(
				self.mset.clone().unwrap_or_default(),
			),
			FunctionKind::ArrayAgg => {
				Value::array(self.items.clone())
			}
			FunctionKind::StdDevPop => {
				if self.count == 0 {
					return Err(Error(
						runtime::invalid_argument(
							fragment.clone(),
							"STDDEV_POP",
							"no input rows",
						),
					));
				}
				let n = self.count as f64;
				let mean = self.sum1 / n;
				let variance = (self.sum_squares / n
					- mean * mean)
					.max(0.0);
				Value::real(variance.sqrt())
			}
			FunctionKind::StdDevSamp => {
				if self.count <= 1 {
					return Err(Error(
						runtime::invalid_argument(
							fragment.clone(),
							"STDDEV_SAMP",
							"fewer than two input rows",
						),
					));
				}
				let n = self.count as f64;
				let variance = ((self.sum_squares
					- self.sum1 * self.sum1 / n)
					/ (n - 1.0))
					.max(0.0);
				Value::real(variance.sqrt())
			}
			other => {
				return Err(Error(internal::internal(format!(
					"{} is not a register aggregate",
					other
				))));
			}
		};
		self.state = RegisterState::Finalized(value.clone());
		Ok(value)
	}

	fn take_extreme(
		&mut self,
		value: &Value,
		wanted: Ordering,
		fragment: &Fragment,
	) -> Result<()> {
		if self.extreme.is_null() {
			self.extreme = value.clone();
			return Ok(());
		}
		if arith::compare(value, &self.extreme, fragment)?
			== Some(wanted)
		{
			self.extreme = value.clone();
		}
		Ok(())
	}

	fn expect_boolean(
		&self,
		value: &Value,
		fragment: &Fragment,
	) -> Result<bool> {
		match value {
			Value::Boolean(b) => Ok(*b),
			other => Err(Error(arithmetic::unsupported_operand(
				fragment.clone(),
				&self.kind.to_string(),
				other.kind(),
			))),
		}
	}

	fn expect_multiset<'a>(
		&self,
		value: &'a Value,
		fragment: &Fragment,
	) -> Result<&'a Multiset> {
		match value {
			Value::Multiset(m) => Ok(m),
			other => Err(Error(arithmetic::unsupported_operand(
				fragment.clone(),
				&self.kind.to_string(),
				other.kind(),
			))),
		}
	}
}

/// The grouping key for a register: the evaluated grouping expressions,
/// in declaration order.
pub type GroupKey = Vec<Value>;

/// All registers of one evaluation, keyed by group and function node.
///
/// Insertion order is preserved, so groups come back out in the order
/// their first row arrived.
#[derive(Debug, Default)]
pub struct RegisterSet {
	registers: IndexMap<(GroupKey, NodeId), Register>,
}

impl RegisterSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.registers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.registers.is_empty()
	}

	/// The register for this group and function node, created at its
	/// identity on first touch.
	pub fn acquire(
		&mut self,
		key: GroupKey,
		node: NodeId,
		kind: FunctionKind,
		distinct: bool,
	) -> &mut Register {
		self.registers
			.entry((key, node))
			.or_insert_with(|| Register::start(kind, distinct))
	}

	pub fn get_mut(
		&mut self,
		key: &[Value],
		node: NodeId,
	) -> Option<&mut Register> {
		self.registers.get_mut(&(key.to_vec(), node))
	}

	/// The distinct group keys, in first-seen order.
	pub fn groups(&self) -> Vec<GroupKey> {
		let mut out: Vec<GroupKey> = Vec::new();
		for (key, _) in self.registers.keys() {
			if !out.contains(key) {
				out.push(key.clone());
			}
		}
		out
	}

	pub fn clear(&mut self) {
		self.registers.clear();
	}
}

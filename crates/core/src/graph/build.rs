// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Validated construction of graph nodes.
//!
//! [`GraphBuilder`] is the only sanctioned way to create nodes: it checks
//! the shape of each construct, computes the node depth from its children
//! and records the best result domain static inference can prove. Children
//! must be published before their parents, which the id-based methods make
//! hard to get wrong.

use emberdb_type::{
	DiagnosticsItem, Domain, DomainId, DomainKind, DomainProvider,
	Fragment, Result, UNCATCHABLE_CLASSES, Value,
};
use smallvec::SmallVec;

use super::expr::{
	BinaryOp, ExpressionNode, FunctionCall, FunctionKind, PeriodOp,
	UnaryOp,
};
use super::stmt::{
	FetchHow, GENERIC_CONDITIONS, HandlerDisposition, Parameter,
	RoutineNode, StatementNode,
};
use super::store::NodeStore;
use super::{Node, NodeId, NodeKind};
use crate::error::GraphError;
use crate::infer;

/// A 5-character SQLSTATE: ASCII digits and uppercase letters only.
pub fn is_sqlstate(code: &str) -> bool {
	code.len() == 5
		&& code.bytes()
			.all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
}

/// Builds and publishes nodes into a [`NodeStore`].
///
/// The builder is cheap to clone; [`GraphBuilder::at`] derives one that
/// attributes its nodes to a statement fragment, which is how positions
/// reach diagnostics.
#[derive(Clone)]
pub struct GraphBuilder<'a> {
	store: &'a NodeStore,
	provider: &'a dyn DomainProvider,
	fragment: Fragment,
}

impl<'a> GraphBuilder<'a> {
	pub fn new(
		store: &'a NodeStore,
		provider: &'a dyn DomainProvider,
	) -> Self {
		Self {
			store,
			provider,
			fragment: Fragment::None,
		}
	}

	/// A builder that stamps every node it publishes with `fragment`.
	pub fn at(&self, fragment: Fragment) -> Self {
		Self {
			store: self.store,
			provider: self.provider,
			fragment,
		}
	}

	pub fn store(&self) -> &'a NodeStore {
		self.store
	}

	fn publish(&self, domain: DomainId, kind: NodeKind) -> Result<NodeId> {
		let mut children = SmallVec::<[NodeId; 8]>::new();
		kind.collect_children(&mut children);
		let mut depth = 0;
		for child in &children {
			depth = depth.max(self.store.lookup(*child)?.depth);
		}
		let id = self.store.allocate();
		self.store.publish(Node {
			id,
			depth: depth + 1,
			domain,
			fragment: self.fragment.clone(),
			kind,
		})?;
		Ok(id)
	}

	fn expression(
		&self,
		domain: DomainId,
		node: ExpressionNode,
	) -> Result<NodeId> {
		self.publish(domain, NodeKind::Expression(node))
	}

	fn statement(&self, node: StatementNode) -> Result<NodeId> {
		self.publish(DomainId::CONTENT, NodeKind::Statement(node))
	}

	fn resolve(&self, id: DomainId) -> Option<Domain> {
		self.provider.lookup(id).or_else(|| Domain::builtin(id))
	}

	fn kind_of(&self, id: NodeId) -> Result<DomainKind> {
		let node = self.store.lookup(id)?;
		Ok(self
			.resolve(node.domain)
			.map(|domain| domain.kind())
			.unwrap_or(DomainKind::Content))
	}

	fn builtin(kind: DomainKind) -> DomainId {
		Domain::builtin_for(kind).unwrap_or(DomainId::CONTENT)
	}

	/// The common domain of a set of branches: their shared builtin
	/// domain when they agree, CONTENT otherwise.
	fn common_domain(&self, branches: &[NodeId]) -> Result<DomainId> {
		let mut common = None;
		for id in branches {
			let kind = self.kind_of(*id)?;
			match common {
				None => common = Some(kind),
				Some(seen) if seen == kind => {}
				Some(_) => return Ok(DomainId::CONTENT),
			}
		}
		Ok(common.map(Self::builtin).unwrap_or(DomainId::CONTENT))
	}

	fn expect_assignable(&self, id: NodeId) -> Result<()> {
		let node = self.store.lookup(id)?;
		match node.expression() {
			Some(ExpressionNode::ColumnRef {
				..
			}) => Ok(()),
			_ => Err(GraphError::NotAssignable {
				fragment: node.fragment.clone(),
			}
			.into()),
		}
	}

	fn expect_all_assignable(&self, ids: &[NodeId]) -> Result<()> {
		for id in ids {
			self.expect_assignable(*id)?;
		}
		Ok(())
	}

	fn missing(&self, construct: &str) -> emberdb_type::Error {
		GraphError::MissingOperand {
			construct: construct.to_string(),
			fragment: self.fragment.clone(),
		}
		.into()
	}

	// --- expressions ---

	pub fn literal(&self, value: Value) -> Result<NodeId> {
		let domain = Domain::builtin_for(value.kind())
			.unwrap_or(DomainId::CONTENT);
		self.expression(domain, ExpressionNode::Literal(value))
	}

	/// A reference to a named variable or cursor column, resolved at
	/// evaluation time.
	pub fn column(&self, name: impl Into<String>) -> Result<NodeId> {
		self.expression(
			DomainId::CONTENT,
			ExpressionNode::ColumnRef {
				of: None,
				name: name.into(),
			},
		)
	}

	/// Access to a named field of a row-valued expression. The result
	/// domain is taken from the row's shape when the provider knows it.
	pub fn field(
		&self,
		of: NodeId,
		name: impl Into<String>,
	) -> Result<NodeId> {
		let name = name.into();
		let row = self.store.lookup(of)?;
		let domain = self
			.resolve(row.domain)
			.and_then(|domain| {
				let shape = domain.shape()?.clone();
				let index = shape.column_index(&name)?;
				shape.domain_at(index)
			})
			.unwrap_or(DomainId::CONTENT);
		self.expression(
			domain,
			ExpressionNode::ColumnRef {
				of: Some(of),
				name,
			},
		)
	}

	pub fn binary(
		&self,
		op: BinaryOp,
		left: NodeId,
		right: NodeId,
	) -> Result<NodeId> {
		let domain = if op == BinaryOp::Index {
			// subscripting a known array domain yields its element
			self.resolve(self.store.lookup(left)?.domain)
				.and_then(|domain| domain.element())
				.unwrap_or(DomainId::CONTENT)
		} else {
			Self::builtin(infer::binary_kind(
				op,
				self.kind_of(left)?,
				self.kind_of(right)?,
			))
		};
		self.expression(
			domain,
			ExpressionNode::Binary {
				op,
				left,
				right,
			},
		)
	}

	pub fn unary(&self, op: UnaryOp, operand: NodeId) -> Result<NodeId> {
		let domain = Self::builtin(infer::unary_kind(
			op,
			self.kind_of(operand)?,
		));
		self.expression(
			domain,
			ExpressionNode::Unary {
				op,
				operand,
			},
		)
	}

	pub fn row(&self, fields: Vec<(String, NodeId)>) -> Result<NodeId> {
		if fields.is_empty() {
			return Err(self.missing("ROW"));
		}
		self.expression(
			DomainId::CONTENT,
			ExpressionNode::RowConstructor {
				fields,
			},
		)
	}

	pub fn array(&self, elements: Vec<NodeId>) -> Result<NodeId> {
		self.expression(
			DomainId::CONTENT,
			ExpressionNode::ArrayConstructor {
				elements,
			},
		)
	}

	/// A scalar subquery over a row source.
	pub fn subquery(&self, source: NodeId) -> Result<NodeId> {
		self.expression(
			DomainId::CONTENT,
			ExpressionNode::Subquery {
				source,
			},
		)
	}

	pub fn exists(&self, source: NodeId) -> Result<NodeId> {
		self.expression(
			DomainId::BOOLEAN,
			ExpressionNode::Exists {
				source,
			},
		)
	}

	/// A function-style call of a declared routine.
	pub fn call(
		&self,
		routine: NodeId,
		args: Vec<NodeId>,
	) -> Result<NodeId> {
		let domain = self
			.store
			.lookup(routine)?
			.routine()
			.and_then(|routine| routine.returns)
			.unwrap_or(DomainId::CONTENT);
		self.expression(
			domain,
			ExpressionNode::Call {
				routine,
				args,
			},
		)
	}

	pub fn case(
		&self,
		operand: Option<NodeId>,
		whens: Vec<(NodeId, NodeId)>,
		otherwise: Option<NodeId>,
	) -> Result<NodeId> {
		if whens.is_empty() {
			return Err(GraphError::EmptyCase {
				fragment: self.fragment.clone(),
			}
			.into());
		}
		let mut results: Vec<NodeId> =
			whens.iter().map(|(_, then)| *then).collect();
		results.extend(otherwise);
		let domain = self.common_domain(&results)?;
		self.expression(
			domain,
			ExpressionNode::Case {
				operand,
				whens,
				otherwise,
			},
		)
	}

	pub fn coalesce(&self, operands: Vec<NodeId>) -> Result<NodeId> {
		if operands.is_empty() {
			return Err(self.missing("COALESCE"));
		}
		let domain = self.common_domain(&operands)?;
		self.expression(
			domain,
			ExpressionNode::Coalesce {
				operands,
			},
		)
	}

	pub fn nullif(&self, left: NodeId, right: NodeId) -> Result<NodeId> {
		// NULLIF keeps the first operand's domain, derived or not
		let domain = self.store.lookup(left)?.domain;
		self.expression(
			domain,
			ExpressionNode::NullIf {
				left,
				right,
			},
		)
	}

	pub fn cast(&self, operand: NodeId, domain: DomainId) -> Result<NodeId> {
		self.expression(
			domain,
			ExpressionNode::Cast {
				operand,
				domain,
			},
		)
	}

	/// Publish a builtin function call. COUNT and the CURRENT_* family
	/// may omit the main operand; rank functions must carry a window.
	pub fn function(&self, call: FunctionCall) -> Result<NodeId> {
		if call.kind.requires_window() && call.window.is_none() {
			return Err(GraphError::WindowRequired {
				function: call.kind.to_string(),
				fragment: self.fragment.clone(),
			}
			.into());
		}
		let optional_value = matches!(
			call.kind,
			FunctionKind::Count
				| FunctionKind::RowNumber
				| FunctionKind::Rank
				| FunctionKind::CurrentDate
				| FunctionKind::CurrentTime
				| FunctionKind::CurrentTimestamp
		);
		if call.value.is_none() && !optional_value {
			return Err(self.missing(&call.kind.to_string()));
		}
		let operand = match call.value {
			Some(value) => self.kind_of(value)?,
			None => DomainKind::Content,
		};
		let domain =
			Self::builtin(infer::function_kind(call.kind, operand));
		self.expression(domain, ExpressionNode::Function(call))
	}

	pub fn between(
		&self,
		value: NodeId,
		low: NodeId,
		high: NodeId,
		negated: bool,
	) -> Result<NodeId> {
		self.expression(
			DomainId::BOOLEAN,
			ExpressionNode::Between {
				value,
				low,
				high,
				negated,
			},
		)
	}

	pub fn like(
		&self,
		value: NodeId,
		pattern: NodeId,
		escape: Option<NodeId>,
		negated: bool,
	) -> Result<NodeId> {
		self.expression(
			DomainId::BOOLEAN,
			ExpressionNode::Like {
				value,
				pattern,
				escape,
				negated,
			},
		)
	}

	pub fn in_list(
		&self,
		value: NodeId,
		list: Vec<NodeId>,
		negated: bool,
	) -> Result<NodeId> {
		if list.is_empty() {
			return Err(self.missing("IN"));
		}
		self.expression(
			DomainId::BOOLEAN,
			ExpressionNode::InList {
				value,
				list,
				negated,
			},
		)
	}

	pub fn in_subquery(
		&self,
		value: NodeId,
		source: NodeId,
		negated: bool,
	) -> Result<NodeId> {
		self.expression(
			DomainId::BOOLEAN,
			ExpressionNode::InSubquery {
				value,
				source,
				negated,
			},
		)
	}

	pub fn member(
		&self,
		value: NodeId,
		collection: NodeId,
		negated: bool,
	) -> Result<NodeId> {
		self.expression(
			DomainId::BOOLEAN,
			ExpressionNode::Member {
				value,
				collection,
				negated,
			},
		)
	}

	pub fn is_null(&self, operand: NodeId, negated: bool) -> Result<NodeId> {
		self.expression(
			DomainId::BOOLEAN,
			ExpressionNode::IsNull {
				operand,
				negated,
			},
		)
	}

	/// `value op ALL (source)` or `value op ANY (source)`. Only
	/// comparison operators can be quantified.
	pub fn quantified(
		&self,
		op: BinaryOp,
		value: NodeId,
		all: bool,
		source: NodeId,
	) -> Result<NodeId> {
		if !op.is_comparison() {
			return Err(GraphError::NotAComparison {
				op,
				fragment: self.fragment.clone(),
			}
			.into());
		}
		self.expression(
			DomainId::BOOLEAN,
			ExpressionNode::Quantified {
				op,
				value,
				all,
				source,
			},
		)
	}

	pub fn period(
		&self,
		op: PeriodOp,
		left: NodeId,
		right: NodeId,
	) -> Result<NodeId> {
		self.expression(
			DomainId::BOOLEAN,
			ExpressionNode::Period {
				op,
				left,
				right,
			},
		)
	}

	// --- statements ---

	pub fn compound(
		&self,
		label: Option<&str>,
		body: Vec<NodeId>,
	) -> Result<NodeId> {
		self.statement(StatementNode::Compound {
			label: label.map(str::to_string),
			body,
		})
	}

	pub fn declare_variable(
		&self,
		name: impl Into<String>,
		domain: DomainId,
		init: Option<NodeId>,
	) -> Result<NodeId> {
		self.statement(StatementNode::DeclareVariable {
			name: name.into(),
			domain,
			init,
		})
	}

	/// Declare a handler. Conditions are SQLSTATE codes or one of
	/// [`GENERIC_CONDITIONS`]; classes that abort unconditionally
	/// cannot be handled and are rejected here.
	pub fn declare_handler(
		&self,
		disposition: HandlerDisposition,
		conditions: &[&str],
		action: NodeId,
	) -> Result<NodeId> {
		if conditions.is_empty() {
			return Err(self.missing("DECLARE HANDLER"));
		}
		for condition in conditions {
			if GENERIC_CONDITIONS.contains(condition) {
				continue;
			}
			if !is_sqlstate(condition) {
				return Err(GraphError::BadSqlstate {
					code: condition.to_string(),
					fragment: self.fragment.clone(),
				}
				.into());
			}
			let class = &condition[..2];
			if UNCATCHABLE_CLASSES.contains(&class)
				|| class == "00"
			{
				return Err(GraphError::UncatchableCondition {
					class: class.to_string(),
					fragment: self.fragment.clone(),
				}
				.into());
			}
		}
		self.statement(StatementNode::DeclareHandler {
			disposition,
			conditions: conditions
				.iter()
				.map(|condition| condition.to_string())
				.collect(),
			action,
		})
	}

	pub fn declare_cursor(
		&self,
		name: impl Into<String>,
		source: NodeId,
	) -> Result<NodeId> {
		self.statement(StatementNode::DeclareCursor {
			name: name.into(),
			source,
		})
	}

	pub fn assign(&self, target: NodeId, value: NodeId) -> Result<NodeId> {
		self.expect_assignable(target)?;
		self.statement(StatementNode::Assign {
			target,
			value,
		})
	}

	pub fn multiple_assign(
		&self,
		targets: Vec<NodeId>,
		value: NodeId,
	) -> Result<NodeId> {
		if targets.is_empty() {
			return Err(self.missing("SET"));
		}
		self.expect_all_assignable(&targets)?;
		self.statement(StatementNode::MultipleAssign {
			targets,
			value,
		})
	}

	pub fn branch(
		&self,
		condition: NodeId,
		then_body: Vec<NodeId>,
		elsifs: Vec<(NodeId, Vec<NodeId>)>,
		otherwise: Vec<NodeId>,
	) -> Result<NodeId> {
		self.statement(StatementNode::Branch {
			condition,
			then_body,
			elsifs,
			otherwise,
		})
	}

	pub fn case_statement(
		&self,
		operand: Option<NodeId>,
		whens: Vec<(Vec<NodeId>, Vec<NodeId>)>,
		otherwise: Option<Vec<NodeId>>,
	) -> Result<NodeId> {
		if whens.is_empty() {
			return Err(GraphError::EmptyCase {
				fragment: self.fragment.clone(),
			}
			.into());
		}
		self.statement(StatementNode::CaseStatement {
			operand,
			whens,
			otherwise,
		})
	}

	pub fn loop_stmt(
		&self,
		label: Option<&str>,
		body: Vec<NodeId>,
	) -> Result<NodeId> {
		self.statement(StatementNode::Loop {
			label: label.map(str::to_string),
			body,
		})
	}

	pub fn while_stmt(
		&self,
		label: Option<&str>,
		condition: NodeId,
		body: Vec<NodeId>,
	) -> Result<NodeId> {
		self.statement(StatementNode::While {
			label: label.map(str::to_string),
			condition,
			body,
		})
	}

	pub fn repeat_stmt(
		&self,
		label: Option<&str>,
		body: Vec<NodeId>,
		until: NodeId,
	) -> Result<NodeId> {
		self.statement(StatementNode::Repeat {
			label: label.map(str::to_string),
			body,
			until,
		})
	}

	pub fn for_cursor(
		&self,
		label: Option<&str>,
		cursor: Option<&str>,
		source: NodeId,
		body: Vec<NodeId>,
	) -> Result<NodeId> {
		self.statement(StatementNode::ForCursor {
			label: label.map(str::to_string),
			cursor: cursor.map(str::to_string),
			source,
			body,
		})
	}

	pub fn break_stmt(&self, label: Option<&str>) -> Result<NodeId> {
		self.statement(StatementNode::Break {
			label: label.map(str::to_string),
		})
	}

	pub fn iterate(&self, label: Option<&str>) -> Result<NodeId> {
		self.statement(StatementNode::Iterate {
			label: label.map(str::to_string),
		})
	}

	pub fn open_cursor(&self, cursor: impl Into<String>) -> Result<NodeId> {
		self.statement(StatementNode::OpenCursor {
			cursor: cursor.into(),
		})
	}

	pub fn close_cursor(&self, cursor: impl Into<String>) -> Result<NodeId> {
		self.statement(StatementNode::CloseCursor {
			cursor: cursor.into(),
		})
	}

	pub fn fetch(
		&self,
		cursor: impl Into<String>,
		how: FetchHow,
		position: Option<NodeId>,
		targets: Vec<NodeId>,
	) -> Result<NodeId> {
		if matches!(how, FetchHow::Absolute | FetchHow::Relative)
			&& position.is_none()
		{
			return Err(self.missing(&format!("FETCH {how}")));
		}
		if targets.is_empty() {
			return Err(self.missing("FETCH INTO"));
		}
		self.expect_all_assignable(&targets)?;
		self.statement(StatementNode::Fetch {
			cursor: cursor.into(),
			how,
			position,
			targets,
		})
	}

	pub fn select_single(
		&self,
		source: NodeId,
		columns: Vec<NodeId>,
		targets: Vec<NodeId>,
	) -> Result<NodeId> {
		if targets.is_empty() {
			return Err(self.missing("SELECT INTO"));
		}
		self.expect_all_assignable(&targets)?;
		self.statement(StatementNode::SelectSingle {
			source,
			columns,
			targets,
		})
	}

	pub fn call_procedure(
		&self,
		routine: NodeId,
		args: Vec<NodeId>,
	) -> Result<NodeId> {
		self.statement(StatementNode::CallProcedure {
			routine,
			args,
		})
	}

	pub fn return_stmt(&self, value: Option<NodeId>) -> Result<NodeId> {
		self.statement(StatementNode::Return {
			value,
		})
	}

	/// SIGNAL a condition. Any well-formed SQLSTATE outside the success
	/// class can be signalled, including the uncatchable ones.
	pub fn signal(
		&self,
		code: &str,
		items: Vec<(DiagnosticsItem, NodeId)>,
	) -> Result<NodeId> {
		self.check_signal_code(code)?;
		self.statement(StatementNode::Signal {
			resignal: false,
			code: Some(code.to_string()),
			items,
		})
	}

	/// RESIGNAL the active condition, optionally replacing its code.
	pub fn resignal(
		&self,
		code: Option<&str>,
		items: Vec<(DiagnosticsItem, NodeId)>,
	) -> Result<NodeId> {
		if let Some(code) = code {
			self.check_signal_code(code)?;
		}
		self.statement(StatementNode::Signal {
			resignal: true,
			code: code.map(str::to_string),
			items,
		})
	}

	fn check_signal_code(&self, code: &str) -> Result<()> {
		if !is_sqlstate(code) || code.starts_with("00") {
			return Err(GraphError::BadSqlstate {
				code: code.to_string(),
				fragment: self.fragment.clone(),
			}
			.into());
		}
		Ok(())
	}

	pub fn get_diagnostics(
		&self,
		items: Vec<(NodeId, DiagnosticsItem)>,
	) -> Result<NodeId> {
		if items.is_empty() {
			return Err(self.missing("GET DIAGNOSTICS"));
		}
		for (target, _) in &items {
			self.expect_assignable(*target)?;
		}
		self.statement(StatementNode::GetDiagnostics {
			items,
		})
	}

	// --- routines ---

	/// Publish a routine definition. Parameter names must be distinct
	/// and every LEAVE/ITERATE in the body must resolve to a label or
	/// loop inside the routine.
	pub fn routine(
		&self,
		name: impl Into<String>,
		params: Vec<Parameter>,
		returns: Option<DomainId>,
		body: NodeId,
	) -> Result<NodeId> {
		for (index, param) in params.iter().enumerate() {
			if params[..index]
				.iter()
				.any(|seen| seen.name == param.name)
			{
				return Err(GraphError::DuplicateParameter {
					name: param.name.clone(),
					fragment: self.fragment.clone(),
				}
				.into());
			}
		}
		verify_labels(self.store, body)?;
		self.publish(
			returns.unwrap_or(DomainId::CONTENT),
			NodeKind::Routine(RoutineNode {
				name: name.into(),
				params,
				returns,
				body,
			}),
		)
	}
}

struct Scope {
	label: Option<String>,
	looping: bool,
}

/// Check that every LEAVE and ITERATE under `root` targets a label or loop
/// that encloses it. Routine bodies reachable through call references are
/// skipped; they are checked when the routine itself is built.
pub fn verify_labels(store: &NodeStore, root: NodeId) -> Result<()> {
	let mut scopes = Vec::new();
	verify_node(store, root, &mut scopes)
}

fn verify_node(
	store: &NodeStore,
	id: NodeId,
	scopes: &mut Vec<Scope>,
) -> Result<()> {
	let node = store.lookup(id)?;
	if node.routine().is_some() {
		return Ok(());
	}
	let entered = match node.statement() {
		Some(StatementNode::Compound {
			label,
			..
		}) => Some(Scope {
			label: label.clone(),
			looping: false,
		}),
		Some(
			StatementNode::Loop {
				label,
				..
			}
			| StatementNode::While {
				label,
				..
			}
			| StatementNode::Repeat {
				label,
				..
			}
			| StatementNode::ForCursor {
				label,
				..
			},
		) => Some(Scope {
			label: label.clone(),
			looping: true,
		}),
		Some(StatementNode::Break {
			label,
		}) => {
			check_break(label.as_deref(), scopes, &node.fragment)?;
			None
		}
		Some(StatementNode::Iterate {
			label,
		}) => {
			check_iterate(label.as_deref(), scopes, &node.fragment)?;
			None
		}
		_ => None,
	};
	let pushed = entered.is_some();
	if let Some(scope) = entered {
		scopes.push(scope);
	}
	for child in node.children() {
		verify_node(store, child, scopes)?;
	}
	if pushed {
		scopes.pop();
	}
	Ok(())
}

fn check_break(
	label: Option<&str>,
	scopes: &[Scope],
	fragment: &Fragment,
) -> Result<()> {
	match label {
		Some(label) => {
			if scopes.iter().any(|scope| {
				scope.label.as_deref() == Some(label)
			}) {
				Ok(())
			} else {
				Err(GraphError::UnknownLabel {
					label: label.to_string(),
					fragment: fragment.clone(),
				}
				.into())
			}
		}
		None => {
			if scopes.iter().any(|scope| scope.looping) {
				Ok(())
			} else {
				Err(GraphError::NoEnclosingLoop {
					fragment: fragment.clone(),
				}
				.into())
			}
		}
	}
}

fn check_iterate(
	label: Option<&str>,
	scopes: &[Scope],
	fragment: &Fragment,
) -> Result<()> {
	match label {
		Some(label) => {
			if scopes.iter().any(|scope| {
				scope.looping
					&& scope.label.as_deref() == Some(label)
			}) {
				Ok(())
			} else {
				Err(GraphError::UnknownLabel {
					label: label.to_string(),
					fragment: fragment.clone(),
				}
				.into())
			}
		}
		None => {
			if scopes.iter().any(|scope| scope.looping) {
				Ok(())
			} else {
				Err(GraphError::NoEnclosingLoop {
					fragment: fragment.clone(),
				}
				.into())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::ParameterMode;

	struct Builtins;

	impl DomainProvider for Builtins {
		fn lookup(&self, id: DomainId) -> Option<Domain> {
			Domain::builtin(id)
		}
	}

	fn fixture() -> (NodeStore, Builtins) {
		(NodeStore::new(), Builtins)
	}

	#[test]
	fn test_literal_domains() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let int = builder.literal(Value::Int(1)).unwrap();
		let null = builder.literal(Value::Null).unwrap();
		assert_eq!(
			store.lookup(int).unwrap().domain,
			DomainId::INTEGER
		);
		assert_eq!(
			store.lookup(null).unwrap().domain,
			DomainId::CONTENT
		);
	}

	#[test]
	fn test_binary_inference_and_depth() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let one = builder.literal(Value::Int(1)).unwrap();
		let two = builder.literal(Value::Int(2)).unwrap();
		let sum = builder.binary(BinaryOp::Add, one, two).unwrap();
		let less = builder
			.binary(BinaryOp::LessThan, sum, one)
			.unwrap();

		let sum_node = store.lookup(sum).unwrap();
		assert_eq!(sum_node.domain, DomainId::INTEGER);
		assert_eq!(sum_node.depth, 2);

		let less_node = store.lookup(less).unwrap();
		assert_eq!(less_node.domain, DomainId::BOOLEAN);
		assert_eq!(less_node.depth, 3);
	}

	#[test]
	fn test_quantified_rejects_arithmetic() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let value = builder.literal(Value::Int(1)).unwrap();
		let source = builder.literal(Value::Int(0)).unwrap();
		let error = builder
			.quantified(BinaryOp::Add, value, true, source)
			.unwrap_err();
		assert_eq!(error.code, "42000");
	}

	#[test]
	fn test_case_requires_when() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let error = builder.case(None, vec![], None).unwrap_err();
		assert_eq!(error.code, "42000");

		let error = builder
			.case_statement(None, vec![], None)
			.unwrap_err();
		assert_eq!(error.code, "42000");
	}

	#[test]
	fn test_case_common_domain() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let cond = builder.literal(Value::Boolean(true)).unwrap();
		let one = builder.literal(Value::Int(1)).unwrap();
		let two = builder.literal(Value::Int(2)).unwrap();
		let text = builder.literal(Value::utf8("x")).unwrap();

		let uniform = builder
			.case(None, vec![(cond, one)], Some(two))
			.unwrap();
		assert_eq!(
			store.lookup(uniform).unwrap().domain,
			DomainId::INTEGER
		);

		let mixed = builder
			.case(None, vec![(cond, one)], Some(text))
			.unwrap();
		assert_eq!(
			store.lookup(mixed).unwrap().domain,
			DomainId::CONTENT
		);
	}

	#[test]
	fn test_handler_condition_validation() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let action = builder.compound(None, vec![]).unwrap();

		builder.declare_handler(
			HandlerDisposition::Continue,
			&["SQLEXCEPTION", "23505"],
			action,
		)
		.unwrap();

		let error = builder
			.declare_handler(
				HandlerDisposition::Exit,
				&["9"],
				action,
			)
			.unwrap_err();
		assert_eq!(error.code, "42000");
		assert!(error.message.contains("SQLSTATE"));

		let error = builder
			.declare_handler(
				HandlerDisposition::Exit,
				&["40001"],
				action,
			)
			.unwrap_err();
		assert!(error.message.contains("never fire"));
	}

	#[test]
	fn test_signal_code_validation() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);

		builder.signal("45000", vec![]).unwrap();
		// uncatchable classes can still be raised
		builder.signal("40001", vec![]).unwrap();

		assert!(builder.signal("4500", vec![]).is_err());
		assert!(builder.signal("45x00", vec![]).is_err());
		// the success class cannot be signalled
		assert!(builder.signal("00000", vec![]).is_err());
	}

	#[test]
	fn test_assign_requires_reference() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let var = builder.column("x").unwrap();
		let value = builder.literal(Value::Int(5)).unwrap();

		builder.assign(var, value).unwrap();

		let error = builder.assign(value, var).unwrap_err();
		assert_eq!(error.code, "42000");
	}

	#[test]
	fn test_fetch_validation() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let target = builder.column("x").unwrap();

		builder.fetch("c", FetchHow::Next, None, vec![target])
			.unwrap();

		let error = builder
			.fetch("c", FetchHow::Absolute, None, vec![target])
			.unwrap_err();
		assert!(error.message.contains("FETCH ABSOLUTE"));

		let error = builder
			.fetch("c", FetchHow::Next, None, vec![])
			.unwrap_err();
		assert!(error.message.contains("FETCH INTO"));
	}

	#[test]
	fn test_routine_rejects_duplicate_parameters() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let body = builder.compound(None, vec![]).unwrap();
		let param = |name: &str| Parameter {
			name: name.to_string(),
			domain: DomainId::INTEGER,
			mode: ParameterMode::In,
		};
		let error = builder
			.routine(
				"f",
				vec![param("a"), param("a")],
				None,
				body,
			)
			.unwrap_err();
		assert_eq!(error.code, "42000");
		assert!(error.message.contains("duplicate"));
	}

	#[test]
	fn test_function_validation() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let operand = builder.literal(Value::Int(3)).unwrap();

		// COUNT(*) has no operand
		builder.function(FunctionCall::of(FunctionKind::Count))
			.unwrap();

		let mut sum = FunctionCall::of(FunctionKind::Sum);
		let error = builder.function(sum.clone()).unwrap_err();
		assert_eq!(error.code, "42000");
		sum.value = Some(operand);
		let id = builder.function(sum).unwrap();
		assert_eq!(
			store.lookup(id).unwrap().domain,
			DomainId::INTEGER
		);

		let error = builder
			.function(FunctionCall::of(FunctionKind::RowNumber))
			.unwrap_err();
		assert!(error.message.contains("OVER"));

		let mut avg = FunctionCall::of(FunctionKind::Avg);
		avg.value = Some(operand);
		let id = builder.function(avg).unwrap();
		assert_eq!(
			store.lookup(id).unwrap().domain,
			DomainId::NUMERIC
		);
	}

	#[test]
	fn test_labels_verified_in_routine_body() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);

		let leave = builder.break_stmt(Some("outer")).unwrap();
		let good = builder
			.loop_stmt(Some("outer"), vec![leave])
			.unwrap();
		builder.routine("p", vec![], None, good).unwrap();

		let stray = builder.break_stmt(Some("missing")).unwrap();
		let body = builder.loop_stmt(Some("outer"), vec![stray]).unwrap();
		let error = builder
			.routine("q", vec![], None, body)
			.unwrap_err();
		assert!(error.message.contains("missing"));
	}

	#[test]
	fn test_iterate_needs_a_loop_label() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);

		// a block label is not a loop label
		let iterate = builder.iterate(Some("blk")).unwrap();
		let block = builder
			.compound(Some("blk"), vec![iterate])
			.unwrap();
		assert!(verify_labels(&store, block).is_err());

		let leave = builder.break_stmt(None).unwrap();
		assert!(verify_labels(&store, leave).is_err());

		let cond = builder.literal(Value::Boolean(true)).unwrap();
		let again = builder.iterate(None).unwrap();
		let looped = builder
			.while_stmt(None, cond, vec![again])
			.unwrap();
		verify_labels(&store, looped).unwrap();
	}

	#[test]
	fn test_nullif_keeps_left_domain() {
		let (store, domains) = fixture();
		let builder = GraphBuilder::new(&store, &domains);
		let left = builder.literal(Value::utf8("a")).unwrap();
		let right = builder.literal(Value::utf8("b")).unwrap();
		let id = builder.nullif(left, right).unwrap();
		assert_eq!(
			store.lookup(id).unwrap().domain,
			DomainId::CHARACTER
		);
	}

	#[test]
	fn test_index_uses_registered_element_domain() {
		struct WithArray;

		impl DomainProvider for WithArray {
			fn lookup(&self, id: DomainId) -> Option<Domain> {
				if id == DomainId::FIRST_DERIVED {
					Some(Domain::array_of(
						DomainId::INTEGER,
					))
				} else {
					Domain::builtin(id)
				}
			}
		}

		let store = NodeStore::new();
		let domains = WithArray;
		let builder = GraphBuilder::new(&store, &domains);
		let array = builder
			.cast(
				builder.array(vec![]).unwrap(),
				DomainId::FIRST_DERIVED,
			)
			.unwrap();
		let index = builder.literal(Value::Int(1)).unwrap();
		let element = builder
			.binary(BinaryOp::Index, array, index)
			.unwrap();
		assert_eq!(
			store.lookup(element).unwrap().domain,
			DomainId::INTEGER
		);
	}
}

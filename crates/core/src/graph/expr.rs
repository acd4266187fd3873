// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use emberdb_type::{DomainId, Value};
use smallvec::SmallVec;

use super::NodeId;
use super::window::WindowSpec;

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	/// Addition, including datetime plus interval
	Add,
	/// Subtraction, including datetime differences
	Subtract,
	Multiply,
	Divide,
	/// String or array concatenation
	Concat,
	/// Three-valued AND
	And,
	/// Three-valued OR
	Or,
	Equal,
	NotEqual,
	LessThan,
	LessThanEqual,
	GreaterThan,
	GreaterThanEqual,
	/// Collection subscript, one-based
	Index,
}

impl BinaryOp {
	pub fn is_comparison(&self) -> bool {
		matches!(
			self,
			BinaryOp::Equal
				| BinaryOp::NotEqual
				| BinaryOp::LessThan
				| BinaryOp::LessThanEqual
				| BinaryOp::GreaterThan
				| BinaryOp::GreaterThanEqual
		)
	}

	pub fn is_logical(&self) -> bool {
		matches!(self, BinaryOp::And | BinaryOp::Or)
	}
}

impl Display for BinaryOp {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			BinaryOp::Add => "+",
			BinaryOp::Subtract => "-",
			BinaryOp::Multiply => "*",
			BinaryOp::Divide => "/",
			BinaryOp::Concat => "||",
			BinaryOp::And => "AND",
			BinaryOp::Or => "OR",
			BinaryOp::Equal => "=",
			BinaryOp::NotEqual => "<>",
			BinaryOp::LessThan => "<",
			BinaryOp::LessThanEqual => "<=",
			BinaryOp::GreaterThan => ">",
			BinaryOp::GreaterThanEqual => ">=",
			BinaryOp::Index => "[]",
		})
	}
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	/// Three-valued NOT
	Not,
	/// Numeric or interval negation
	Neg,
}

impl Display for UnaryOp {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			UnaryOp::Not => "NOT",
			UnaryOp::Neg => "-",
		})
	}
}

/// Builtin functions, both scalar and aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
	// aggregates
	Count,
	Sum,
	Avg,
	Min,
	Max,
	/// Boolean fold, true when every input is true
	Every,
	/// Boolean fold, true when any input is true
	Any,
	/// Fold the inputs into a multiset
	Collect,
	/// Multiset union over the inputs
	Fusion,
	/// Multiset intersection over the inputs
	Intersection,
	ArrayAgg,
	StdDevPop,
	StdDevSamp,
	// window rankers
	RowNumber,
	Rank,
	// scalars
	Abs,
	Mod,
	Ceil,
	Floor,
	Exp,
	Ln,
	Power,
	Sqrt,
	CharLength,
	Upper,
	Lower,
	Trim,
	Substring,
	Position,
	Extract,
	CurrentDate,
	CurrentTime,
	CurrentTimestamp,
	Cardinality,
}

impl FunctionKind {
	pub fn is_aggregate(&self) -> bool {
		matches!(
			self,
			FunctionKind::Count
				| FunctionKind::Sum
				| FunctionKind::Avg
				| FunctionKind::Min
				| FunctionKind::Max
				| FunctionKind::Every
				| FunctionKind::Any
				| FunctionKind::Collect
				| FunctionKind::Fusion
				| FunctionKind::Intersection
				| FunctionKind::ArrayAgg
				| FunctionKind::StdDevPop
				| FunctionKind::StdDevSamp
				| FunctionKind::RowNumber
				| FunctionKind::Rank
		)
	}

	/// Rank functions are only meaningful with a window.
	pub fn requires_window(&self) -> bool {
		matches!(self, FunctionKind::RowNumber | FunctionKind::Rank)
	}
}

impl Display for FunctionKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			FunctionKind::Count => "COUNT",
			FunctionKind::Sum => "SUM",
			FunctionKind::Avg => "AVG",
			FunctionKind::Min => "MIN",
			FunctionKind::Max => "MAX",
			FunctionKind::Every => "EVERY",
			FunctionKind::Any => "ANY",
			FunctionKind::Collect => "COLLECT",
			FunctionKind::Fusion => "FUSION",
			FunctionKind::Intersection => "INTERSECTION",
			FunctionKind::ArrayAgg => "ARRAY_AGG",
			FunctionKind::StdDevPop => "STDDEV_POP",
			FunctionKind::StdDevSamp => "STDDEV_SAMP",
			FunctionKind::RowNumber => "ROW_NUMBER",
			FunctionKind::Rank => "RANK",
			FunctionKind::Abs => "ABS",
			FunctionKind::Mod => "MOD",
			FunctionKind::Ceil => "CEIL",
			FunctionKind::Floor => "FLOOR",
			FunctionKind::Exp => "EXP",
			FunctionKind::Ln => "LN",
			FunctionKind::Power => "POWER",
			FunctionKind::Sqrt => "SQRT",
			FunctionKind::CharLength => "CHAR_LENGTH",
			FunctionKind::Upper => "UPPER",
			FunctionKind::Lower => "LOWER",
			FunctionKind::Trim => "TRIM",
			FunctionKind::Substring => "SUBSTRING",
			FunctionKind::Position => "POSITION",
			FunctionKind::Extract => "EXTRACT",
			FunctionKind::CurrentDate => "CURRENT_DATE",
			FunctionKind::CurrentTime => "CURRENT_TIME",
			FunctionKind::CurrentTimestamp => "CURRENT_TIMESTAMP",
			FunctionKind::Cardinality => "CARDINALITY",
		})
	}
}

/// TRIM sides and EXTRACT fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionModifier {
	Leading,
	Trailing,
	Both,
	Year,
	Month,
	Day,
	Hour,
	Minute,
	Second,
}

impl Display for FunctionModifier {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			FunctionModifier::Leading => "LEADING",
			FunctionModifier::Trailing => "TRAILING",
			FunctionModifier::Both => "BOTH",
			FunctionModifier::Year => "YEAR",
			FunctionModifier::Month => "MONTH",
			FunctionModifier::Day => "DAY",
			FunctionModifier::Hour => "HOUR",
			FunctionModifier::Minute => "MINUTE",
			FunctionModifier::Second => "SECOND",
		})
	}
}

/// A call of a builtin function, with the clauses that can decorate it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
	pub kind: FunctionKind,
	/// The main operand. `None` for COUNT(*) and the CURRENT_* family.
	pub value: Option<NodeId>,
	/// Second operand: POWER exponent, SUBSTRING start, POSITION
	/// haystack, MOD divisor, TRIM character.
	pub op1: Option<NodeId>,
	/// Third operand: SUBSTRING length.
	pub op2: Option<NodeId>,
	pub modifier: Option<FunctionModifier>,
	/// DISTINCT folding for aggregates.
	pub distinct: bool,
	/// FILTER conditions; a row feeds the aggregate only when all hold.
	pub filter: Vec<NodeId>,
	pub window: Option<Box<WindowSpec>>,
}

impl FunctionCall {
	pub fn of(kind: FunctionKind) -> Self {
		Self {
			kind,
			value: None,
			op1: None,
			op2: None,
			modifier: None,
			distinct: false,
			filter: Vec::new(),
			window: None,
		}
	}
}

/// Temporal relations between two periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodOp {
	Overlaps,
	Contains,
	Equals,
	Precedes,
	Succeeds,
	ImmediatelyPrecedes,
	ImmediatelySucceeds,
}

impl Display for PeriodOp {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			PeriodOp::Overlaps => "OVERLAPS",
			PeriodOp::Contains => "CONTAINS",
			PeriodOp::Equals => "EQUALS",
			PeriodOp::Precedes => "PRECEDES",
			PeriodOp::Succeeds => "SUCCEEDS",
			PeriodOp::ImmediatelyPrecedes => {
				"IMMEDIATELY PRECEDES"
			}
			PeriodOp::ImmediatelySucceeds => {
				"IMMEDIATELY SUCCEEDS"
			}
		})
	}
}

/// An expression node of the statement graph.
///
/// Nodes reference their children by [`NodeId`]; the node itself is
/// immutable once published.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
	/// A constant value
	Literal(Value),
	/// A reference to a variable, or to a field of `of`
	ColumnRef {
		of: Option<NodeId>,
		name: String,
	},
	Binary {
		op: BinaryOp,
		left: NodeId,
		right: NodeId,
	},
	Unary {
		op: UnaryOp,
		operand: NodeId,
	},
	/// ROW(a, b, ...) with field names
	RowConstructor {
		fields: Vec<(String, NodeId)>,
	},
	/// ARRAY[a, b, ...]
	ArrayConstructor {
		elements: Vec<NodeId>,
	},
	/// A scalar subquery: exactly one column, at most one row
	Subquery {
		source: NodeId,
	},
	/// A call of a declared routine
	Call {
		routine: NodeId,
		args: Vec<NodeId>,
	},
	/// Searched or simple CASE
	Case {
		operand: Option<NodeId>,
		whens: Vec<(NodeId, NodeId)>,
		otherwise: Option<NodeId>,
	},
	/// First non-null operand
	Coalesce {
		operands: Vec<NodeId>,
	},
	/// Null when both sides are equal
	NullIf {
		left: NodeId,
		right: NodeId,
	},
	Cast {
		operand: NodeId,
		domain: DomainId,
	},
	/// A builtin function, possibly aggregate or windowed
	Function(FunctionCall),
	Between {
		value: NodeId,
		low: NodeId,
		high: NodeId,
		negated: bool,
	},
	Like {
		value: NodeId,
		pattern: NodeId,
		escape: Option<NodeId>,
		negated: bool,
	},
	InList {
		value: NodeId,
		list: Vec<NodeId>,
		negated: bool,
	},
	InSubquery {
		value: NodeId,
		source: NodeId,
		negated: bool,
	},
	/// MEMBER OF a multiset
	Member {
		value: NodeId,
		collection: NodeId,
		negated: bool,
	},
	IsNull {
		operand: NodeId,
		negated: bool,
	},
	/// value op ALL/ANY (subquery)
	Quantified {
		op: BinaryOp,
		value: NodeId,
		all: bool,
		source: NodeId,
	},
	/// EXISTS (subquery)
	Exists {
		source: NodeId,
	},
	/// Period predicates over (start, end) pairs
	Period {
		op: PeriodOp,
		left: NodeId,
		right: NodeId,
	},
}

impl ExpressionNode {
	pub(crate) fn collect_children(&self, out: &mut SmallVec<[NodeId; 8]>) {
		use ExpressionNode::*;
		match self {
			Literal(_) => {}
			ColumnRef {
				of,
				..
			} => out.extend(of.iter().copied()),
			Binary {
				left,
				right,
				..
			} => {
				out.push(*left);
				out.push(*right);
			}
			Unary {
				operand,
				..
			} => out.push(*operand),
			RowConstructor {
				fields,
			} => out.extend(fields.iter().map(|(_, id)| *id)),
			ArrayConstructor {
				elements,
			} => out.extend(elements.iter().copied()),
			Subquery {
				source,
			}
			| Exists {
				source,
			} => out.push(*source),
			Call {
				routine,
				args,
			} => {
				out.push(*routine);
				out.extend(args.iter().copied());
			}
			Case {
				operand,
				whens,
				otherwise,
			} => {
				out.extend(operand.iter().copied());
				for (when, then) in whens {
					out.push(*when);
					out.push(*then);
				}
				out.extend(otherwise.iter().copied());
			}
			Coalesce {
				operands,
			} => out.extend(operands.iter().copied()),
			NullIf {
				left,
				right,
			} => {
				out.push(*left);
				out.push(*right);
			}
			Cast {
				operand,
				..
			} => out.push(*operand),
			Function(call) => {
				out.extend(call.value.iter().copied());
				out.extend(call.op1.iter().copied());
				out.extend(call.op2.iter().copied());
				out.extend(call.filter.iter().copied());
				if let Some(window) = &call.window {
					window.collect_children(out);
				}
			}
			Between {
				value,
				low,
				high,
				..
			} => {
				out.push(*value);
				out.push(*low);
				out.push(*high);
			}
			Like {
				value,
				pattern,
				escape,
				..
			} => {
				out.push(*value);
				out.push(*pattern);
				out.extend(escape.iter().copied());
			}
			InList {
				value,
				list,
				..
			} => {
				out.push(*value);
				out.extend(list.iter().copied());
			}
			InSubquery {
				value,
				source,
				..
			}
			| Member {
				value,
				collection: source,
				..
			}
			| Quantified {
				value,
				source,
				..
			} => {
				out.push(*value);
				out.push(*source);
			}
			IsNull {
				operand,
				..
			} => out.push(*operand),
			Period {
				left,
				right,
				..
			} => {
				out.push(*left);
				out.push(*right);
			}
		}
	}

	pub(crate) fn fix(&self, map: &HashMap<NodeId, NodeId>) -> Self {
		use ExpressionNode::*;
		let r = |id: &NodeId| map.get(id).copied().unwrap_or(*id);
		let ro = |id: &Option<NodeId>| id.as_ref().map(r);
		match self {
			Literal(value) => Literal(value.clone()),
			ColumnRef {
				of,
				name,
			} => ColumnRef {
				of: ro(of),
				name: name.clone(),
			},
			Binary {
				op,
				left,
				right,
			} => Binary {
				op: *op,
				left: r(left),
				right: r(right),
			},
			Unary {
				op,
				operand,
			} => Unary {
				op: *op,
				operand: r(operand),
			},
			RowConstructor {
				fields,
			} => RowConstructor {
				fields: fields
					.iter()
					.map(|(name, id)| {
						(name.clone(), r(id))
					})
					.collect(),
			},
			ArrayConstructor {
				elements,
			} => ArrayConstructor {
				elements: elements.iter().map(r).collect(),
			},
			Subquery {
				source,
			} => Subquery {
				source: r(source),
			},
			Exists {
				source,
			} => Exists {
				source: r(source),
			},
			Call {
				routine,
				args,
			} => Call {
				routine: r(routine),
				args: args.iter().map(r).collect(),
			},
			Case {
				operand,
				whens,
				otherwise,
			} => Case {
				operand: ro(operand),
				whens: whens
					.iter()
					.map(|(when, then)| {
						(r(when), r(then))
					})
					.collect(),
				otherwise: ro(otherwise),
			},
			Coalesce {
				operands,
			} => Coalesce {
				operands: operands.iter().map(r).collect(),
			},
			NullIf {
				left,
				right,
			} => NullIf {
				left: r(left),
				right: r(right),
			},
			Cast {
				operand,
				domain,
			} => Cast {
				operand: r(operand),
				domain: *domain,
			},
			Function(call) => Function(FunctionCall {
				kind: call.kind,
				value: ro(&call.value),
				op1: ro(&call.op1),
				op2: ro(&call.op2),
				modifier: call.modifier,
				distinct: call.distinct,
				filter: call.filter.iter().map(r).collect(),
				window: call
					.window
					.as_ref()
					.map(|w| Box::new(w.fix(map))),
			}),
			Between {
				value,
				low,
				high,
				negated,
			} => Between {
				value: r(value),
				low: r(low),
				high: r(high),
				negated: *negated,
			},
			Like {
				value,
				pattern,
				escape,
				negated,
			} => Like {
				value: r(value),
				pattern: r(pattern),
				escape: ro(escape),
				negated: *negated,
			},
			InList {
				value,
				list,
				negated,
			} => InList {
				value: r(value),
				list: list.iter().map(r).collect(),
				negated: *negated,
			},
			InSubquery {
				value,
				source,
				negated,
			} => InSubquery {
				value: r(value),
				source: r(source),
				negated: *negated,
			},
			Member {
				value,
				collection,
				negated,
			} => Member {
				value: r(value),
				collection: r(collection),
				negated: *negated,
			},
			IsNull {
				operand,
				negated,
			} => IsNull {
				operand: r(operand),
				negated: *negated,
			},
			Quantified {
				op,
				value,
				all,
				source,
			} => Quantified {
				op: *op,
				value: r(value),
				all: *all,
				source: r(source),
			},
			Period {
				op,
				left,
				right,
			} => Period {
				op: *op,
				left: r(left),
				right: r(right),
			},
		}
	}
}

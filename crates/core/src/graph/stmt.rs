// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use emberdb_type::{DiagnosticsItem, DomainId};
use smallvec::SmallVec;

use super::NodeId;

/// The generic condition names a handler can be declared for, besides
/// concrete SQLSTATE codes.
pub const GENERIC_CONDITIONS: [&str; 3] =
	["SQLEXCEPTION", "SQLWARNING", "NOT FOUND"];

/// What a handler does with control after its body ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerDisposition {
	/// Resume after the statement that raised
	Continue,
	/// Leave the block that declared the handler
	Exit,
	/// Roll work back to the block entry, then leave it
	Undo,
}

impl Display for HandlerDisposition {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			HandlerDisposition::Continue => "CONTINUE",
			HandlerDisposition::Exit => "EXIT",
			HandlerDisposition::Undo => "UNDO",
		})
	}
}

/// Cursor positioning for FETCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchHow {
	Next,
	Prior,
	First,
	Last,
	/// To the row at the evaluated position, counted from 1; negative
	/// counts from the end
	Absolute,
	/// By the evaluated offset from the current row
	Relative,
}

impl Display for FetchHow {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			FetchHow::Next => "NEXT",
			FetchHow::Prior => "PRIOR",
			FetchHow::First => "FIRST",
			FetchHow::Last => "LAST",
			FetchHow::Absolute => "ABSOLUTE",
			FetchHow::Relative => "RELATIVE",
		})
	}
}

/// Parameter passing modes of a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterMode {
	In,
	Out,
	InOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
	pub name: String,
	pub domain: DomainId,
	pub mode: ParameterMode,
}

/// A declared procedure or function.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineNode {
	pub name: String,
	pub params: Vec<Parameter>,
	/// `Some` for functions, `None` for procedures
	pub returns: Option<DomainId>,
	pub body: NodeId,
}

impl RoutineNode {
	pub(crate) fn collect_children(&self, out: &mut SmallVec<[NodeId; 8]>) {
		out.push(self.body);
	}

	pub(crate) fn fix(&self, map: &HashMap<NodeId, NodeId>) -> Self {
		Self {
			name: self.name.clone(),
			params: self.params.clone(),
			returns: self.returns,
			body: map
				.get(&self.body)
				.copied()
				.unwrap_or(self.body),
		}
	}
}

/// A statement node of the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementNode {
	/// BEGIN ... END, optionally labelled
	Compound {
		label: Option<String>,
		body: Vec<NodeId>,
	},
	DeclareVariable {
		name: String,
		domain: DomainId,
		init: Option<NodeId>,
	},
	/// DECLARE ... HANDLER FOR condition list
	DeclareHandler {
		disposition: HandlerDisposition,
		/// SQLSTATE strings or the generic names SQLEXCEPTION,
		/// SQLWARNING, NOT FOUND
		conditions: Vec<String>,
		action: NodeId,
	},
	DeclareCursor {
		name: String,
		source: NodeId,
	},
	/// SET target = value
	Assign {
		target: NodeId,
		value: NodeId,
	},
	/// SET (a, b) = row-valued expression
	MultipleAssign {
		targets: Vec<NodeId>,
		value: NodeId,
	},
	/// IF / ELSEIF / ELSE
	Branch {
		condition: NodeId,
		then_body: Vec<NodeId>,
		elsifs: Vec<(NodeId, Vec<NodeId>)>,
		otherwise: Vec<NodeId>,
	},
	/// CASE statement; raises when nothing matches and there is no ELSE
	CaseStatement {
		operand: Option<NodeId>,
		whens: Vec<(Vec<NodeId>, Vec<NodeId>)>,
		otherwise: Option<Vec<NodeId>>,
	},
	Loop {
		label: Option<String>,
		body: Vec<NodeId>,
	},
	While {
		label: Option<String>,
		condition: NodeId,
		body: Vec<NodeId>,
	},
	/// Body runs at least once, stops when `until` turns true
	Repeat {
		label: Option<String>,
		body: Vec<NodeId>,
		until: NodeId,
	},
	/// Iterate a row source, binding each row's fields
	ForCursor {
		label: Option<String>,
		cursor: Option<String>,
		source: NodeId,
		body: Vec<NodeId>,
	},
	/// LEAVE
	Break {
		label: Option<String>,
	},
	/// ITERATE: restart the labelled loop
	Iterate {
		label: Option<String>,
	},
	OpenCursor {
		cursor: String,
	},
	CloseCursor {
		cursor: String,
	},
	Fetch {
		cursor: String,
		how: FetchHow,
		/// Required for ABSOLUTE and RELATIVE
		position: Option<NodeId>,
		targets: Vec<NodeId>,
	},
	/// SELECT ... INTO over a row source; at most one row
	SelectSingle {
		source: NodeId,
		columns: Vec<NodeId>,
		targets: Vec<NodeId>,
	},
	CallProcedure {
		routine: NodeId,
		args: Vec<NodeId>,
	},
	Return {
		value: Option<NodeId>,
	},
	/// SIGNAL or, inside a handler, RESIGNAL
	Signal {
		resignal: bool,
		/// `None` only for RESIGNAL, which reuses the active condition
		code: Option<String>,
		items: Vec<(DiagnosticsItem, NodeId)>,
	},
	/// GET DIAGNOSTICS target = item pairs
	GetDiagnostics {
		items: Vec<(NodeId, DiagnosticsItem)>,
	},
}

impl StatementNode {
	pub(crate) fn collect_children(&self, out: &mut SmallVec<[NodeId; 8]>) {
		use StatementNode::*;
		match self {
			Compound {
				body,
				..
			}
			| Loop {
				body,
				..
			} => out.extend(body.iter().copied()),
			DeclareVariable {
				init,
				..
			} => out.extend(init.iter().copied()),
			DeclareHandler {
				action,
				..
			} => out.push(*action),
			DeclareCursor {
				source,
				..
			} => out.push(*source),
			Assign {
				target,
				value,
			} => {
				out.push(*target);
				out.push(*value);
			}
			MultipleAssign {
				targets,
				value,
			} => {
				out.extend(targets.iter().copied());
				out.push(*value);
			}
			Branch {
				condition,
				then_body,
				elsifs,
				otherwise,
			} => {
				out.push(*condition);
				out.extend(then_body.iter().copied());
				for (when, body) in elsifs {
					out.push(*when);
					out.extend(body.iter().copied());
				}
				out.extend(otherwise.iter().copied());
			}
			CaseStatement {
				operand,
				whens,
				otherwise,
			} => {
				out.extend(operand.iter().copied());
				for (matches, body) in whens {
					out.extend(matches.iter().copied());
					out.extend(body.iter().copied());
				}
				if let Some(body) = otherwise {
					out.extend(body.iter().copied());
				}
			}
			While {
				condition,
				body,
				..
			} => {
				out.push(*condition);
				out.extend(body.iter().copied());
			}
			Repeat {
				body,
				until,
				..
			} => {
				out.extend(body.iter().copied());
				out.push(*until);
			}
			ForCursor {
				source,
				body,
				..
			} => {
				out.push(*source);
				out.extend(body.iter().copied());
			}
			Break {
				..
			}
			| Iterate {
				..
			}
			| OpenCursor {
				..
			}
			| CloseCursor {
				..
			} => {}
			Fetch {
				position,
				targets,
				..
			} => {
				out.extend(position.iter().copied());
				out.extend(targets.iter().copied());
			}
			SelectSingle {
				source,
				columns,
				targets,
			} => {
				out.push(*source);
				out.extend(columns.iter().copied());
				out.extend(targets.iter().copied());
			}
			CallProcedure {
				routine,
				args,
			} => {
				out.push(*routine);
				out.extend(args.iter().copied());
			}
			Return {
				value,
			} => out.extend(value.iter().copied()),
			Signal {
				items,
				..
			} => out.extend(items.iter().map(|(_, id)| *id)),
			GetDiagnostics {
				items,
			} => out.extend(items.iter().map(|(id, _)| *id)),
		}
	}

	pub(crate) fn fix(&self, map: &HashMap<NodeId, NodeId>) -> Self {
		use StatementNode::*;
		let r = |id: &NodeId| map.get(id).copied().unwrap_or(*id);
		let ro = |id: &Option<NodeId>| id.as_ref().map(r);
		let rv = |ids: &Vec<NodeId>| {
			ids.iter().map(r).collect::<Vec<_>>()
		};
		match self {
			Compound {
				label,
				body,
			} => Compound {
				label: label.clone(),
				body: rv(body),
			},
			DeclareVariable {
				name,
				domain,
				init,
			} => DeclareVariable {
				name: name.clone(),
				domain: *domain,
				init: ro(init),
			},
			DeclareHandler {
				disposition,
				conditions,
				action,
			} => DeclareHandler {
				disposition: *disposition,
				conditions: conditions.clone(),
				action: r(action),
			},
			DeclareCursor {
				name,
				source,
			} => DeclareCursor {
				name: name.clone(),
				source: r(source),
			},
			Assign {
				target,
				value,
			} => Assign {
				target: r(target),
				value: r(value),
			},
			MultipleAssign {
				targets,
				value,
			} => MultipleAssign {
				targets: rv(targets),
				value: r(value),
			},
			Branch {
				condition,
				then_body,
				elsifs,
				otherwise,
			} => Branch {
				condition: r(condition),
				then_body: rv(then_body),
				elsifs: elsifs
					.iter()
					.map(|(when, body)| {
						(r(when), rv(body))
					})
					.collect(),
				otherwise: rv(otherwise),
			},
			CaseStatement {
				operand,
				whens,
				otherwise,
			} => CaseStatement {
				operand: ro(operand),
				whens: whens
					.iter()
					.map(|(matches, body)| {
						(rv(matches), rv(body))
					})
					.collect(),
				otherwise: otherwise.as_ref().map(|body| rv(body)),
			},
			Loop {
				label,
				body,
			} => Loop {
				label: label.clone(),
				body: rv(body),
			},
			While {
				label,
				condition,
				body,
			} => While {
				label: label.clone(),
				condition: r(condition),
				body: rv(body),
			},
			Repeat {
				label,
				body,
				until,
			} => Repeat {
				label: label.clone(),
				body: rv(body),
				until: r(until),
			},
			ForCursor {
				label,
				cursor,
				source,
				body,
			} => ForCursor {
				label: label.clone(),
				cursor: cursor.clone(),
				source: r(source),
				body: rv(body),
			},
			Break {
				label,
			} => Break {
				label: label.clone(),
			},
			Iterate {
				label,
			} => Iterate {
				label: label.clone(),
			},
			OpenCursor {
				cursor,
			} => OpenCursor {
				cursor: cursor.clone(),
			},
			CloseCursor {
				cursor,
			} => CloseCursor {
				cursor: cursor.clone(),
			},
			Fetch {
				cursor,
				how,
				position,
				targets,
			} => Fetch {
				cursor: cursor.clone(),
				how: *how,
				position: ro(position),
				targets: rv(targets),
			},
			SelectSingle {
				source,
				columns,
				targets,
			} => SelectSingle {
				source: r(source),
				columns: rv(columns),
				targets: rv(targets),
			},
			CallProcedure {
				routine,
				args,
			} => CallProcedure {
				routine: r(routine),
				args: rv(args),
			},
			Return {
				value,
			} => Return {
				value: ro(value),
			},
			Signal {
				resignal,
				code,
				items,
			} => Signal {
				resignal: *resignal,
				code: code.clone(),
				items: items
					.iter()
					.map(|(item, id)| (*item, r(id)))
					.collect(),
			},
			GetDiagnostics {
				items,
			} => GetDiagnostics {
				items: items
					.iter()
					.map(|(id, item)| (r(id), *item))
					.collect(),
			},
		}
	}
}

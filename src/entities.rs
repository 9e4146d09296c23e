//! Parsing the text of the entities lump into key/value entities.

use std::collections::BTreeMap;

use derive_more::{Deref, IntoIterator};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BspParseError, BspResult};

/// A single `{ ... }` block of the entities lump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, IntoIterator)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct BspEntity {
	#[deref]
	#[into_iterator(owned, ref)]
	pub properties: BTreeMap<String, String>,
}

impl BspEntity {
	#[inline]
	pub fn get(&self, key: &str) -> Option<&str> {
		self.properties.get(key).map(String::as_str)
	}

	#[inline]
	pub fn classname(&self) -> Option<&str> {
		self.get("classname")
	}
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
	Open,
	Close,
	Str(&'a str),
}

struct Tokenizer<'a> {
	input: &'a str,
	pos: usize,
	line: usize,
}

impl<'a> Tokenizer<'a> {
	fn error(&self, message: impl Into<String>) -> BspParseError {
		BspParseError::InvalidEntities {
			line: self.line,
			message: message.into(),
		}
	}

	fn skip_whitespace_and_comments(&mut self) {
		loop {
			let input = self.input;
			let rest = &input[self.pos..];
			let trimmed = rest.trim_start();
			self.line += rest[..rest.len() - trimmed.len()].matches('\n').count();
			self.pos += rest.len() - trimmed.len();

			if trimmed.starts_with("//") {
				self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
			} else {
				return;
			}
		}
	}

	fn next_token(&mut self) -> BspResult<Option<Token<'a>>> {
		self.skip_whitespace_and_comments();
		let input = self.input;
		let rest = &input[self.pos..];

		match rest.chars().next() {
			None => Ok(None),
			Some('{') => {
				self.pos += 1;
				Ok(Some(Token::Open))
			}
			Some('}') => {
				self.pos += 1;
				Ok(Some(Token::Close))
			}
			Some('"') => {
				let Some(len) = rest[1..].find(['"', '\n']).filter(|i| rest[1..].as_bytes()[*i] == b'"') else {
					return Err(self.error("Unterminated string"));
				};
				self.pos += len + 2;
				Ok(Some(Token::Str(&rest[1..len + 1])))
			}
			Some(c) => Err(self.error(format!("Unexpected character {c:?}"))),
		}
	}
}

/// Parses the entities lump, see [`BspData::entities`](crate::BspData::entities).
///
/// Every entity is a `{ }` block holding `"key" "value"` pairs. If a key shows up twice in one entity, the last
/// value wins.
pub fn parse_entities(input: &str) -> BspResult<Vec<BspEntity>> {
	let mut tokenizer = Tokenizer { input, pos: 0, line: 1 };
	let mut entities = Vec::new();

	while let Some(token) = tokenizer.next_token()? {
		if token != Token::Open {
			return Err(tokenizer.error("Expected '{' to start an entity"));
		}

		let mut entity = BspEntity::default();
		loop {
			match tokenizer.next_token()? {
				Some(Token::Close) => break,
				Some(Token::Str(key)) => {
					let Some(Token::Str(value)) = tokenizer.next_token()? else {
						return Err(tokenizer.error(format!("Property {key:?} has no value")));
					};
					entity.properties.insert(key.to_string(), value.to_string());
				}
				Some(Token::Open) => return Err(tokenizer.error("Entities can't be nested")),
				None => return Err(tokenizer.error("Unexpected end of input, missing '}'")),
			}
		}
		entities.push(entity);
	}

	log::debug!("Parsed {} entities", entities.len());
	Ok(entities)
}

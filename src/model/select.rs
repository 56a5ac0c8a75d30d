use serde::Serialize;

use crate::model::is_identifier;
use crate::store::StoreError;

/// One entry of a select expression such as
/// `*, partners ( partner_name ), source:warehouses!source_warehouse_id ( wh_name )`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SelectItem {
    /// Every column of the collection
    Star,
    Column {
        name: String,
        alias: Option<String>,
    },
    /// A related collection embedded as a nested object (or array)
    Embed(EmbedSpec),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedSpec {
    pub relation: String,
    pub alias: Option<String>,
    /// Foreign-key column that disambiguates the join
    pub hint: Option<String>,
    pub items: Vec<SelectItem>,
}

impl EmbedSpec {
    /// Key under which the embedded value appears in the row
    pub fn output_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.relation)
    }
}

impl SelectItem {
    pub fn column(name: impl Into<String>) -> Self {
        SelectItem::Column {
            name: name.into(),
            alias: None,
        }
    }
}

/// Parse a select expression. An empty expression selects every column.
pub fn parse_select(expr: &str) -> Result<Vec<SelectItem>, StoreError> {
    let mut parser = SelectParser {
        src: expr.as_bytes(),
        pos: 0,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Ok(vec![SelectItem::Star]);
    }

    let items = parser.parse_list()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected character"));
    }
    Ok(items)
}

struct SelectParser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> SelectParser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, what: &str) -> StoreError {
        StoreError::InvalidQuery(format!(
            "select expression: {} at position {}",
            what, self.pos
        ))
    }

    fn parse_list(&mut self) -> Result<Vec<SelectItem>, StoreError> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_item()?);
            if !self.eat(b',') {
                break;
            }
        }
        Ok(items)
    }

    fn parse_item(&mut self) -> Result<SelectItem, StoreError> {
        if self.eat(b'*') {
            return Ok(SelectItem::Star);
        }

        let first = self.identifier()?;
        let (alias, name) = if self.eat(b':') {
            (Some(first), self.identifier()?)
        } else {
            (None, first)
        };
        let hint = if self.eat(b'!') {
            Some(self.identifier()?)
        } else {
            None
        };

        if self.eat(b'(') {
            let items = self.parse_list()?;
            if !self.eat(b')') {
                return Err(self.error("expected ')'"));
            }
            return Ok(SelectItem::Embed(EmbedSpec {
                relation: name,
                alias,
                hint,
                items,
            }));
        }

        if hint.is_some() {
            return Err(self.error("join hint without embedded field list"));
        }
        Ok(SelectItem::Column { name, alias })
    }

    fn identifier(&mut self) -> Result<String, StoreError> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        // Only ASCII bytes were consumed, so the slice is valid UTF-8
        let ident = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        if !is_identifier(&ident) {
            return Err(self.error("expected identifier"));
        }
        Ok(ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_star_and_embeds() {
        let items = parse_select("*, partners ( partner_name ), warehouses ( wh_name )").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], SelectItem::Star);
        match &items[1] {
            SelectItem::Embed(embed) => {
                assert_eq!(embed.relation, "partners");
                assert_eq!(embed.output_key(), "partners");
                assert_eq!(embed.items, vec![SelectItem::column("partner_name")]);
            }
            other => panic!("expected embed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_alias_and_hint() {
        let items =
            parse_select("gt_no,source:warehouses!source_warehouse_id(wh_name)").unwrap();
        assert_eq!(items[0], SelectItem::column("gt_no"));
        match &items[1] {
            SelectItem::Embed(embed) => {
                assert_eq!(embed.output_key(), "source");
                assert_eq!(embed.hint.as_deref(), Some("source_warehouse_id"));
            }
            other => panic!("expected embed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_expression_selects_everything() {
        assert_eq!(parse_select("  ").unwrap(), vec![SelectItem::Star]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_select("partners ( partner_name").is_err());
        assert!(parse_select("org_code,").is_err());
        assert!(parse_select("warehouses!branch_id").is_err());
        assert!(parse_select("org_code; drop table").is_err());
    }
}

use super::{PResult, Parser};
use crate::model::ColumnType;

#[derive(Default)]
struct ColumnAttrs {
    column_type: Option<ColumnType>,
    bad_type: bool,
    selected: bool,
    hidden: bool,
}

impl Parser {
    /// `(name ((TYPE> KIND) (SELECTED> b) (HIDDEN> b)))`
    pub(super) fn column_decl(&mut self) -> PResult<()> {
        self.expect_open()?;
        let name_at = self.pos();
        let name = self.take_nominal()?;
        let mut attrs = ColumnAttrs::default();
        self.list(|p| p.column_attr(&mut attrs))?;
        self.expect_close()?;

        tracing::trace!(column = %name, kind = ?attrs.column_type, "column declaration");

        let column_type = match attrs.column_type {
            Some(t) => t,
            None if attrs.bad_type => return Ok(()),
            None => {
                return self.error_at(name_at, format!("column '{}' has no TYPE>", name));
            }
        };
        let created = self.db.create_variable(&name, column_type);
        let Some(id) = self.model(name_at, created)? else {
            return Ok(());
        };
        if let Some(column) = self.db.column_mut(id) {
            column.set_selected(attrs.selected);
            column.set_hidden(attrs.hidden);
        }
        Ok(())
    }

    fn column_attr(&mut self, attrs: &mut ColumnAttrs) -> PResult<()> {
        let at = self.pos();
        self.expect_open()?;
        match self.take_label()?.as_str() {
            "TYPE>" => {
                let type_at = self.pos();
                let keyword = self.take_nominal()?;
                self.expect_close()?;
                match ColumnType::from_keyword(&keyword) {
                    Some(t) => attrs.column_type = Some(t),
                    None => {
                        attrs.bad_type = true;
                        self.error_at(type_at, format!("unknown column type '{}'", keyword))?;
                    }
                }
            }
            "SELECTED>" => attrs.selected = self.bool_entry()?,
            "HIDDEN>" => attrs.hidden = self.bool_entry()?,
            other => {
                self.warning_at(at, format!("unknown column attribute '{}' ignored", other))?;
                self.skip_rest()?;
            }
        }
        Ok(())
    }
}

use super::{Formatter, Params, ToSql};

/// A backtick-quoted identifier. Backticks inside the name are doubled.
pub(crate) struct Ident<S>(pub(crate) S);

/// A column qualified by its table alias: `` `alias`.`column` ``.
pub(crate) struct Column<A, C>(pub(crate) A, pub(crate) C);

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let name = self.0.as_ref().trim_matches('`');
        f.dst.push('`');
        f.dst.push_str(&name.replace('`', "``"));
        f.dst.push('`');
    }
}

impl<A: AsRef<str>, C: AsRef<str>> ToSql for Column<A, C> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Ident(self.0) "." Ident(self.1));
    }
}

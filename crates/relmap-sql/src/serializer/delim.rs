use super::{Formatter, Params, ToSql};

/// Comma delimited
pub(crate) struct Comma<L>(pub(crate) L);

/// Delimited by an arbitrary separator, e.g. `" AND "`
pub(crate) struct Delimited<L>(pub(crate) L, pub(crate) &'static str);

impl<L> ToSql for Comma<L>
where
    L: IntoIterator,
    L::Item: ToSql,
{
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        Delimited(self.0, ", ").to_sql(f);
    }
}

impl<L> ToSql for Delimited<L>
where
    L: IntoIterator,
    L::Item: ToSql,
{
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let mut s = "";
        for i in self.0 {
            fmt!(f, s i);
            s = self.1;
        }
    }
}

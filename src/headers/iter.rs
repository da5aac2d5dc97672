use std::slice;

use super::Headers;

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);

    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over header fields, returned from [`Headers::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    iter: slice::Iter<'a, (String, String)>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(iter: slice::Iter<'a, (String, String)>) -> Self {
        Self { iter }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> { }

/// Iterator over values of one key, returned from [`Headers::get_all`].
#[derive(Debug, Clone)]
pub struct GetAll<'a> {
    iter: slice::Iter<'a, (String, String)>,
    key: &'a str,
}

impl<'a> GetAll<'a> {
    pub(crate) fn new(iter: slice::Iter<'a, (String, String)>, key: &'a str) -> Self {
        Self { iter, key }
    }
}

impl<'a> Iterator for GetAll<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter
            .by_ref()
            .find_map(|(k, v)| (k == self.key).then_some(v.as_str()))
    }
}

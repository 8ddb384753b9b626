use crate::common::address::Short;
use core::ops::Add;

/// Set of short addresses, iterated in ascending order
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct ShortSet(u64);

impl ShortSet {
    pub fn new() -> ShortSet {
        ShortSet(0)
    }

    pub fn contains(&self, addr: Short) -> bool {
        self.0 & (1u64 << addr.value()) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Short> + '_ {
        Short::all().filter(|a| self.contains(*a))
    }

    pub fn to_vec(&self) -> Vec<Short> {
        self.iter().collect()
    }
}

impl FromIterator<Short> for ShortSet {
    fn from_iter<I: IntoIterator<Item = Short>>(iter: I) -> Self {
        iter.into_iter().fold(ShortSet::new(), |s, a| s + a)
    }
}

impl Add<Short> for ShortSet {
    type Output = ShortSet;
    fn add(self, b: Short) -> Self::Output {
        Self(self.0 | (1u64 << b.value()))
    }
}

#[cfg(test)]
mod test {
    use super::ShortSet;
    use crate::common::address::Short;

    fn s(a: u8) -> Short {
        Short::new(a)
    }

    #[test]
    fn add_test() {
        let a = ShortSet::new();
        assert!(!a.contains(s(5)));
        let b = a + s(5) + s(9) + s(5);
        assert_eq!(b.to_vec(), vec![s(5), s(9)]);
    }

    #[test]
    fn iter_test() {
        let a: ShortSet = [s(63), s(0), s(17)].into_iter().collect();
        assert_eq!(a.to_vec(), vec![s(0), s(17), s(63)]);
        assert!(a.contains(s(63)));
        assert!(!a.contains(s(62)));
    }
}

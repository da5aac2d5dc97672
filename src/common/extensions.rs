use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    hash::{BuildHasherDefault, Hasher},
};

#[derive(Default)]
struct NoopHasher(u64);

impl Hasher for NoopHasher {
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    fn write(&mut self, bytes: &[u8]) {
        // `TypeId` hashes through `write_u64` or `write_u128` depending on the toolchain
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

type AnyMap = HashMap<TypeId, Box<dyn Any + Send>, BuildHasherDefault<NoopHasher>>;

/// Type keyed storage attached to a connection.
///
/// Used for both `assigns`, values shared between handlers, and `private`, values owned by
/// library code such as the multipart cursor.
pub struct Extensions {
    map: Option<AnyMap>,
}

impl Extensions {
    /// Create new [`Extensions`].
    ///
    /// This function does not allocate.
    pub const fn new() -> Self {
        Self { map: None }
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.map.as_ref().map(HashMap::len).unwrap_or_default()
    }

    /// Returns `true` if the map contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a value of type `T` is present.
    pub fn contains<T: Send + 'static>(&self) -> bool {
        self.map
            .as_ref()
            .is_some_and(|map| map.contains_key(&TypeId::of::<T>()))
    }

    /// Returns a reference to the value corresponding to the type.
    pub fn get<T: Send + 'static>(&self) -> Option<&T> {
        self.map
            .as_ref()
            .and_then(|map| map.get(&TypeId::of::<T>()))
            .and_then(|ok| ok.downcast_ref())
    }

    /// Returns a mutable reference to the value corresponding to the type.
    pub fn get_mut<T: Send + 'static>(&mut self) -> Option<&mut T> {
        self.map
            .as_mut()
            .and_then(|map| map.get_mut(&TypeId::of::<T>()))
            .and_then(|ok| ok.downcast_mut())
    }

    /// Inserts a value into the map, returning the previous value of the same type.
    pub fn insert<T: Send + 'static>(&mut self, value: T) -> Option<T> {
        self.map
            .get_or_insert_with(AnyMap::default)
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|ok| ok.downcast().map(|e| *e).ok())
    }

    /// Removes and returns the value at the type if the type was previously in the map.
    pub fn remove<T: Send + 'static>(&mut self) -> Option<T> {
        self.map
            .as_mut()
            .and_then(|map| map.remove(&TypeId::of::<T>()))
            .and_then(|ok| ok.downcast().map(|e| *e).ok())
    }

    /// Clears the map. Keeps the allocated memory for reuse.
    pub fn clear(&mut self) {
        if let Some(map) = self.map.as_mut() {
            map.clear();
        }
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("length", &self.len())
            .finish()
    }
}

#[test]
fn test_extensions() {
    #[derive(Debug, PartialEq)]
    struct UserId(u64);

    let mut extensions = Extensions::new();
    assert!(extensions.is_empty());

    extensions.insert(5i32);
    extensions.insert(UserId(10));

    assert_eq!(extensions.len(), 2);
    assert_eq!(extensions.get(), Some(&5i32));
    assert_eq!(extensions.get_mut(), Some(&mut 5i32));
    assert!(extensions.contains::<UserId>());

    assert_eq!(extensions.insert(UserId(11)), Some(UserId(10)));
    assert_eq!(extensions.remove::<i32>(), Some(5i32));
    assert!(extensions.get::<i32>().is_none());

    assert_eq!(extensions.get::<bool>(), None);
    assert_eq!(extensions.get(), Some(&UserId(11)));

    extensions.clear();
    assert!(extensions.is_empty());
}

use crate::maybestd::{fmt, marker::PhantomData, vec::Vec};
use sha2::digest::{consts::U32, Digest};
use sha2::Sha256;

use crate::error::NmtError;
use crate::simple_merkle::{error::RangeProofError, tree::MerkleHash};

/// The length of a hash in bytes
pub const HASH_LEN: usize = 32;
/// The default base hash. Currently sha256
pub type DefaultHasher = Sha256;

/// A domain separator indicating that a node is a leaf
pub const LEAF_DOMAIN_SEPARATOR: [u8; 1] = [0u8];
/// A domain separator indicating that a node is internal
pub const INTERNAL_NODE_DOMAIN_SEPARATOR: [u8; 1] = [1u8];

/// Wraps a 32-byte base hash, turning it into a hash function that tags every node with the
/// namespace range of the leaves below it.
///
/// The hasher holds no state. Each digest is computed by a fresh `D`, so one instance can be
/// shared freely between threads.
pub struct NamespacedHasher<D, const NS_ID_SIZE: usize> {
    _digest: PhantomData<fn() -> D>,
}

/// A namespaced hasher over sha256
pub type NamespacedSha2Hasher<const NS_ID_SIZE: usize> = NamespacedHasher<Sha256, NS_ID_SIZE>;

impl<D, const NS_ID_SIZE: usize> NamespacedHasher<D, NS_ID_SIZE> {
    /// Creates a new hasher
    pub const fn new() -> Self {
        Self {
            _digest: PhantomData,
        }
    }
}

impl<D, const NS_ID_SIZE: usize> Default for NamespacedHasher<D, NS_ID_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, const NS_ID_SIZE: usize> Clone for NamespacedHasher<D, NS_ID_SIZE> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<D, const NS_ID_SIZE: usize> PartialEq for NamespacedHasher<D, NS_ID_SIZE> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<D, const NS_ID_SIZE: usize> fmt::Debug for NamespacedHasher<D, NS_ID_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespacedHasher")
            .field("namespace_size", &NS_ID_SIZE)
            .finish()
    }
}

/// A merkle hasher which can also hash leaves under a namespace
pub trait NamespaceMerkleHasher<const NS_ID_SIZE: usize>:
    MerkleHash<Output = NamespacedHash<NS_ID_SIZE>>
{
    /// Hash the given data and namespace
    fn hash_leaf_with_namespace(
        &self,
        data: &[u8],
        namespace: NamespaceId<NS_ID_SIZE>,
    ) -> NamespacedHash<NS_ID_SIZE>;
}

impl<D, const NS_ID_SIZE: usize> NamespaceMerkleHasher<NS_ID_SIZE>
    for NamespacedHasher<D, NS_ID_SIZE>
where
    D: Digest<OutputSize = U32>,
{
    fn hash_leaf_with_namespace(
        &self,
        data: &[u8],
        namespace: NamespaceId<NS_ID_SIZE>,
    ) -> NamespacedHash<NS_ID_SIZE> {
        let mut output = NamespacedHash::with_min_and_max_ns(namespace, namespace);
        let mut hasher = D::new_with_prefix(LEAF_DOMAIN_SEPARATOR);
        hasher.update(namespace.as_ref());
        hasher.update(data);
        output.set_hash(hasher.finalize().as_ref());
        output
    }
}

impl<D, const NS_ID_SIZE: usize> MerkleHash for NamespacedHasher<D, NS_ID_SIZE>
where
    D: Digest<OutputSize = U32>,
{
    type Output = NamespacedHash<NS_ID_SIZE>;

    fn empty_root(&self) -> Self::Output {
        let mut output = NamespacedHash::default();
        output.set_hash(D::new().finalize().as_ref());
        output
    }

    /// Combines two children whose namespace ranges do not interleave. Trees only ever
    /// call this on leaves pushed in namespace order.
    fn hash_nodes(&self, left: &Self::Output, right: &Self::Output) -> Self::Output {
        let mut output =
            NamespacedHash::with_min_and_max_ns(left.min_namespace(), right.max_namespace());
        let mut hasher = D::new_with_prefix(INTERNAL_NODE_DOMAIN_SEPARATOR);
        hasher.update(left.to_bytes());
        hasher.update(right.to_bytes());
        output.set_hash(hasher.finalize().as_ref());
        output
    }

    fn check_children(&self, left: &Self::Output, right: &Self::Output) -> Result<(), RangeProofError> {
        if left.min_namespace() > left.max_namespace()
            || right.min_namespace() > right.max_namespace()
            || left.max_namespace() > right.min_namespace()
        {
            return Err(RangeProofError::MalformedTree);
        }
        Ok(())
    }
}

/// A namespace identifier
#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Copy, Clone, Hash)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct NamespaceId<const NS_ID_SIZE: usize>(pub [u8; NS_ID_SIZE]);

impl<const NS_ID_SIZE: usize> Default for NamespaceId<NS_ID_SIZE> {
    fn default() -> Self {
        Self([0; NS_ID_SIZE])
    }
}

impl<const NS_ID_SIZE: usize> NamespaceId<NS_ID_SIZE> {
    /// The minimum possible namespace id
    pub const MIN_ID: NamespaceId<NS_ID_SIZE> = NamespaceId([0; NS_ID_SIZE]);

    /// Returns the width of the namespace in bytes
    pub const fn size() -> usize {
        NS_ID_SIZE
    }
}

impl<const NS_ID_SIZE: usize> AsRef<[u8]> for NamespaceId<NS_ID_SIZE> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<const NS_ID_SIZE: usize> TryFrom<&[u8]> for NamespaceId<NS_ID_SIZE> {
    type Error = NmtError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = <[u8; NS_ID_SIZE]>::try_from(value).map_err(|_| {
            NmtError::InvalidNamespaceSize {
                expected: NS_ID_SIZE,
                actual: value.len(),
            }
        })?;
        Ok(Self(bytes))
    }
}

/// A hash of some data, together with a namespace range
///
/// The byte encoding is `min_ns || max_ns || hash`.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct NamespacedHash<const NS_ID_SIZE: usize> {
    min_ns: NamespaceId<NS_ID_SIZE>,
    max_ns: NamespaceId<NS_ID_SIZE>,
    hash: [u8; HASH_LEN],
}

#[cfg(feature = "serde")]
impl<const NS_ID_SIZE: usize> serde::Serialize for NamespacedHash<NS_ID_SIZE> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut seq = serializer.serialize_tuple(NamespacedHash::<NS_ID_SIZE>::size())?;
        for byte in self.iter() {
            seq.serialize_element(&byte)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, const NS_ID_SIZE: usize> serde::Deserialize<'de> for NamespacedHash<NS_ID_SIZE> {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as serde::Deserializer<'de>>::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct NamespacedHashVisitor<const NS_ID_SIZE: usize>;

        impl<'de, const NS_ID_SIZE: usize> serde::de::Visitor<'de> for NamespacedHashVisitor<NS_ID_SIZE> {
            type Value = NamespacedHash<NS_ID_SIZE>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "an array of length {}",
                    NamespacedHash::<NS_ID_SIZE>::size()
                )
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let bytes: Vec<u8> = (0..NamespacedHash::<NS_ID_SIZE>::size())
                    .map(|i| {
                        seq.next_element()?
                            .ok_or_else(|| serde::de::Error::invalid_length(i, &self))
                    })
                    .collect::<Result<_, _>>()?;
                NamespacedHash::try_from(bytes.as_slice()).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_tuple(
            NamespacedHash::<NS_ID_SIZE>::size(),
            NamespacedHashVisitor::<NS_ID_SIZE>,
        )
    }
}

impl<const NS_ID_SIZE: usize> Default for NamespacedHash<NS_ID_SIZE> {
    fn default() -> Self {
        Self {
            min_ns: NamespaceId::default(),
            max_ns: NamespaceId::default(),
            hash: [0u8; HASH_LEN],
        }
    }
}

impl<const NS_ID_SIZE: usize> NamespacedHash<NS_ID_SIZE> {
    /// Returns the size of the hash in bytes
    pub const fn size() -> usize {
        2 * NS_ID_SIZE + HASH_LEN
    }

    /// Construct a new namespaced hash from the provided components
    pub const fn new(
        min_ns: NamespaceId<NS_ID_SIZE>,
        max_ns: NamespaceId<NS_ID_SIZE>,
        hash: [u8; HASH_LEN],
    ) -> Self {
        Self {
            min_ns,
            max_ns,
            hash,
        }
    }

    /// Construct a namespaced hash with the provided namespace range and the zero hash
    pub fn with_min_and_max_ns(
        min_ns: NamespaceId<NS_ID_SIZE>,
        max_ns: NamespaceId<NS_ID_SIZE>,
    ) -> Self {
        Self {
            min_ns,
            max_ns,
            ..Default::default()
        }
    }

    /// Returns the min namespace id of the hash
    pub fn min_namespace(&self) -> NamespaceId<NS_ID_SIZE> {
        self.min_ns
    }

    /// Returns the max namespace id of the hash
    pub fn max_namespace(&self) -> NamespaceId<NS_ID_SIZE> {
        self.max_ns
    }

    /// Returns the hash without the namespace range
    pub fn hash(&self) -> [u8; HASH_LEN] {
        self.hash
    }

    fn set_hash(&mut self, new_hash: &[u8]) {
        self.hash.copy_from_slice(new_hash)
    }

    /// Returns an iterator of the bytes of the namespaced hash
    pub fn iter(&self) -> impl Iterator<Item = u8> {
        self.min_ns
            .0
            .into_iter()
            .chain(self.max_ns.0)
            .chain(self.hash)
    }

    /// Returns the wire encoding `min_ns || max_ns || hash`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::size());
        out.extend_from_slice(self.min_ns.as_ref());
        out.extend_from_slice(self.max_ns.as_ref());
        out.extend_from_slice(&self.hash);
        out
    }
}

impl<const NS_ID_SIZE: usize> TryFrom<&[u8]> for NamespacedHash<NS_ID_SIZE> {
    type Error = NmtError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() != NamespacedHash::<NS_ID_SIZE>::size() {
            return Err(NmtError::InvalidNamespacedHash { len: value.len() });
        }
        let (min_ns, rest) = value.split_at(NS_ID_SIZE);
        let (max_ns, hash) = rest.split_at(NS_ID_SIZE);
        let mut out = Self::with_min_and_max_ns(min_ns.try_into()?, max_ns.try_into()?);
        out.set_hash(hash);
        Ok(out)
    }
}

//! Views over raw byte buffers that start with a namespace prefix.
//!
//! Each view shares its buffer through [`Bytes`], so slicing many leaves out of one
//! block never copies or aliases mutable memory.

use bytes::Bytes;

use crate::error::NmtError;
use crate::maybestd::vec::Vec;
use crate::namespaced_hash::NamespaceId;

/// Data that carries its own namespace and can be pushed into a tree.
pub trait NamespacedData {
    /// Returns the namespace prefix
    fn namespace_id(&self) -> &[u8];
    /// Returns the data without the namespace
    fn data(&self) -> &[u8];
    /// Returns the number of bytes the namespace takes up
    fn namespace_size(&self) -> u8;
    /// Returns the canonical encoding, `namespace || data`
    fn to_bytes(&self) -> Bytes;

    /// Returns the namespace as a fixed-width id
    fn namespace<const NS_ID_SIZE: usize>(&self) -> Result<NamespaceId<NS_ID_SIZE>, NmtError> {
        NamespaceId::try_from(self.namespace_id())
    }
}

macro_rules! fixed_prefixed_data {
    ($name:ident, $size:literal) => {
        #[doc = concat!("A buffer whose first ", stringify!($size), " bytes are its namespace.")]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(Bytes);

        impl $name {
            /// Wraps `bytes`, which must be at least as long as the namespace
            pub fn new(bytes: impl Into<Bytes>) -> Result<Self, NmtError> {
                let bytes = bytes.into();
                if bytes.len() < $size {
                    return Err(NmtError::LeafTooShort {
                        namespace_size: $size,
                        len: bytes.len(),
                    });
                }
                Ok(Self(bytes))
            }
        }

        impl NamespacedData for $name {
            fn namespace_id(&self) -> &[u8] {
                &self.0[..$size]
            }

            fn data(&self) -> &[u8] {
                &self.0[$size..]
            }

            fn namespace_size(&self) -> u8 {
                $size
            }

            fn to_bytes(&self) -> Bytes {
                self.0.clone()
            }
        }
    };
}

fixed_prefixed_data!(PrefixedData8, 8);
fixed_prefixed_data!(PrefixedData16, 16);
fixed_prefixed_data!(PrefixedData32, 32);

/// A buffer with a namespace prefix of any width up to 255 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedData {
    namespace_len: u8,
    prefixed_data: Bytes,
}

impl PrefixedData {
    /// Wraps `prefixed_data`, whose first `namespace_len` bytes are the namespace
    pub fn new(namespace_len: u8, prefixed_data: impl Into<Bytes>) -> Result<Self, NmtError> {
        let prefixed_data = prefixed_data.into();
        if prefixed_data.len() < namespace_len as usize {
            return Err(NmtError::LeafTooShort {
                namespace_size: namespace_len as usize,
                len: prefixed_data.len(),
            });
        }
        Ok(Self {
            namespace_len,
            prefixed_data,
        })
    }

    /// Builds the buffer `namespace || data`
    pub fn from_parts(namespace: &[u8], data: &[u8]) -> Result<Self, NmtError> {
        let namespace_len =
            u8::try_from(namespace.len()).map_err(|_| NmtError::InvalidNamespaceSize {
                expected: u8::MAX as usize,
                actual: namespace.len(),
            })?;
        let mut prefixed_data = Vec::with_capacity(namespace.len() + data.len());
        prefixed_data.extend_from_slice(namespace);
        prefixed_data.extend_from_slice(data);
        Ok(Self {
            namespace_len,
            prefixed_data: prefixed_data.into(),
        })
    }
}

impl NamespacedData for PrefixedData {
    fn namespace_id(&self) -> &[u8] {
        &self.prefixed_data[..self.namespace_len as usize]
    }

    fn data(&self) -> &[u8] {
        &self.prefixed_data[self.namespace_len as usize..]
    }

    fn namespace_size(&self) -> u8 {
        self.namespace_len
    }

    fn to_bytes(&self) -> Bytes {
        self.prefixed_data.clone()
    }
}

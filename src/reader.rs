//! Module containing the core of reading a binary BSP file and interpreting it into structured data.

use std::mem;

use glam::Vec3;

use crate::{BspParseError, BspResult};

/// Like a [`Cursor`](std::io::Cursor), but i don't have to constantly juggle buffers.
#[derive(Clone)]
pub struct BspByteReader<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> BspByteReader<'a> {
	#[inline]
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	fn rest(&self) -> &'a [u8] {
		&self.bytes[self.pos.min(self.bytes.len())..]
	}

	/// Number of bytes left to read.
	#[inline]
	pub fn len(&self) -> usize {
		self.rest().len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.rest().is_empty()
	}

	#[inline]
	pub fn read<T: BspValue>(&mut self) -> BspResult<T> {
		T::bsp_parse(self)
	}

	pub fn read_bytes(&mut self, count: usize) -> BspResult<&'a [u8]> {
		let (from, to) = (self.pos, self.pos.saturating_add(count));
		if to > self.bytes.len() {
			return Err(BspParseError::BufferOutOfBounds {
				from,
				to,
				size: self.bytes.len(),
			});
		}
		let bytes = &self.bytes[from..to];
		self.pos = to;
		Ok(bytes)
	}

	#[inline]
	pub fn with_pos(&self, pos: usize) -> Self {
		Self { bytes: self.bytes, pos }
	}

	#[inline]
	pub fn pos(&self) -> usize {
		self.pos
	}
}

/// Defines how a type should be read from a BSP file.
pub trait BspValue: Sized {
	/// Number of bytes this type takes up on disk.
	const BSP_STRUCT_SIZE: usize;

	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self>;
}

macro_rules! impl_bsp_parse_primitive {
	($ty:ty) => {
		impl BspValue for $ty {
			const BSP_STRUCT_SIZE: usize = mem::size_of::<$ty>();

			#[inline]
			fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
				let mut bytes = [0; mem::size_of::<$ty>()];
				bytes.copy_from_slice(reader.read_bytes(mem::size_of::<$ty>())?);
				Ok(<$ty>::from_le_bytes(bytes))
			}
		}
	};
}

impl_bsp_parse_primitive!(u16);
impl_bsp_parse_primitive!(u32);

impl_bsp_parse_primitive!(i16);
impl_bsp_parse_primitive!(i32);

impl_bsp_parse_primitive!(f32);

impl BspValue for u8 {
	const BSP_STRUCT_SIZE: usize = 1;

	#[inline]
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		reader.read_bytes(1).map(|bytes| bytes[0])
	}
}

impl BspValue for Vec3 {
	const BSP_STRUCT_SIZE: usize = mem::size_of::<f32>() * 3;

	#[inline]
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		Ok(Vec3::from_array(reader.read::<[f32; 3]>()?))
	}
}

impl<T: BspValue, const N: usize> BspValue for [T; N] {
	const BSP_STRUCT_SIZE: usize = T::BSP_STRUCT_SIZE * N;

	#[inline]
	fn bsp_parse(reader: &mut BspByteReader) -> BspResult<Self> {
		// Look ma, no heap allocations!
		let mut out = [(); N].map(|_| mem::MaybeUninit::<T>::uninit());
		for (i, slot) in out.iter_mut().enumerate() {
			match reader.read() {
				Ok(value) => {
					slot.write(value);
				}
				Err(err) => {
					// Drop what was already read before bailing.
					for initialized in &mut out[..i] {
						// SAFETY: Every slot before `i` has been written to.
						unsafe { initialized.assume_init_drop() };
					}
					return Err(err);
				}
			}
		}
		// SAFETY: The loop above either writes every slot or returns.
		Ok(out.map(|v| unsafe { v.assume_init() }))
	}
}

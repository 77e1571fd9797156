//! CPU-written, GPU-read buffer of fixed-stride elements

use std::marker::PhantomData;

use crate::render::constants::constant_buffer_byte_size;
use crate::render::{RenderError, RenderResult};

/// Upload heap storage for `count` elements of `T`
///
/// Constant buffers round each element up to 256 bytes so every element
/// can be bound at its own offset.
pub struct UploadBuffer<T> {
    name: &'static str,
    data: Vec<u8>,
    stride: usize,
    count: usize,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> UploadBuffer<T> {
    /// Allocate zeroed storage for `count` elements
    pub fn new(name: &'static str, count: usize, is_constant_buffer: bool) -> Self {
        let element_size = std::mem::size_of::<T>();
        let stride = if is_constant_buffer {
            constant_buffer_byte_size(element_size)
        } else {
            element_size
        };

        Self {
            name,
            data: vec![0; stride * count],
            stride,
            count,
            _marker: PhantomData,
        }
    }

    /// Write `value` into element `index`
    pub fn copy_data(&mut self, index: usize, value: &T) -> RenderResult<()> {
        let offset = self.offset(index)?;
        let bytes = bytemuck::bytes_of(value);
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Read element `index` back
    pub fn read(&self, index: usize) -> RenderResult<T> {
        let offset = self.offset(index)?;
        let size = std::mem::size_of::<T>();
        Ok(bytemuck::pod_read_unaligned(&self.data[offset..offset + size]))
    }

    /// Byte offset of element `index`, the address a draw binds
    pub fn offset(&self, index: usize) -> RenderResult<usize> {
        if index >= self.count {
            log::error!("{} slot {} out of range ({} slots)", self.name, index, self.count);
            return Err(RenderError::SlotOutOfRange {
                buffer: self.name,
                index,
                capacity: self.count,
            });
        }
        Ok(index * self.stride)
    }

    /// Bytes between consecutive elements
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Raw contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::constants::ObjectConstants;

    #[test]
    fn test_constant_buffer_stride_is_aligned() {
        let buffer: UploadBuffer<ObjectConstants> = UploadBuffer::new("objects", 3, true);
        assert_eq!(buffer.stride(), 256);
        assert_eq!(buffer.as_bytes().len(), 768);
        assert_eq!(buffer.offset(2).unwrap(), 512);
    }

    #[test]
    fn test_plain_buffer_is_tightly_packed() {
        let buffer: UploadBuffer<[f32; 3]> = UploadBuffer::new("positions", 4, false);
        assert_eq!(buffer.stride(), 12);
    }

    #[test]
    fn test_write_then_read_element() {
        let mut buffer: UploadBuffer<u32> = UploadBuffer::new("ids", 4, false);
        buffer.copy_data(2, &7).unwrap();
        assert_eq!(buffer.read(2).unwrap(), 7);
        assert_eq!(buffer.read(1).unwrap(), 0);
    }

    #[test]
    fn test_out_of_range_write_is_rejected() {
        let mut buffer: UploadBuffer<u32> = UploadBuffer::new("ids", 2, false);
        assert_eq!(
            buffer.copy_data(2, &1),
            Err(RenderError::SlotOutOfRange { buffer: "ids", index: 2, capacity: 2 })
        );
    }
}

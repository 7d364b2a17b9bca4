use crate::TileError;
use anyhow::Result;
use serde::Serialize;

/// A band's 1-based index and its name, `band{index}` unless the source names it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BandDescriptor {
	pub index: usize,
	pub name: String,
	/// Set for alpha/mask channels, which never show up in statistics.
	#[serde(skip)]
	pub is_alpha: bool,
}

impl BandDescriptor {
	#[must_use]
	pub fn new(index: usize, name: Option<&str>) -> BandDescriptor {
		let name = match name {
			Some(name) if !name.is_empty() => name.to_string(),
			_ => format!("band{index}"),
		};
		BandDescriptor {
			index,
			name,
			is_alpha: false,
		}
	}

	#[must_use]
	pub fn alpha(mut self) -> BandDescriptor {
		self.is_alpha = true;
		self
	}
}

/// Ordered 1-based band indexes requested by a caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BandSelection(pub Vec<usize>);

impl BandSelection {
	/// Resolves the selection against the bands of a source.
	///
	/// Without a selection, all non-alpha bands are returned in native order.
	///
	/// # Errors
	/// Fails with `INVALID_BAND` for an empty selection or an index outside `1..=bands.len()`.
	pub fn resolve(selection: Option<&BandSelection>, bands: &[BandDescriptor]) -> Result<Vec<BandDescriptor>> {
		let Some(selection) = selection else {
			let data_bands: Vec<BandDescriptor> = bands.iter().filter(|b| !b.is_alpha).cloned().collect();
			return Ok(if data_bands.is_empty() { bands.to_vec() } else { data_bands });
		};
		if selection.0.is_empty() {
			return Err(TileError::InvalidBand("band selection is empty".to_string()).into());
		}
		selection
			.0
			.iter()
			.map(|&index| {
				if index == 0 || index > bands.len() {
					Err(TileError::InvalidBand(format!("band {index} requested, but the source has {} bands", bands.len())).into())
				} else {
					Ok(bands[index - 1].clone())
				}
			})
			.collect()
	}
}

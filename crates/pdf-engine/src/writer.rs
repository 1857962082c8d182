//! Document output collaborator
//!
//! `DocumentWriter` is the contract the export projection draws through;
//! `LopdfWriter` assembles the output by merging source documents and
//! appending overlay content streams to the copied pages.

use crate::codec::{self, RasterFormat};
use crate::{inherited_attribute, normalize_rotation, page_size_of, PageSize, PdfEngineError};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeSet, HashMap};

/// Normalized RGB color (each channel 0.0..=1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };
}

/// Where a primitive lands, in document units.
///
/// `(x, y)` is the primitive's own bottom-left corner (the baseline start for
/// text); `rotation_deg` turns it counter-clockwise about that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation_deg: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    pub fn base_name(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FontRequest<'a> {
    Standard(StandardFont),
    Embedded { name: &'a str, bytes: &'a [u8] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputPage(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: FontHandle,
    pub size: f32,
    pub color: Rgb,
    pub opacity: f32,
}

pub trait DocumentWriter {
    /// Appends a copy of `page_index` from `source`; `source_key` lets the
    /// writer import each distinct source only once.
    fn copy_page(
        &mut self,
        source_key: u64,
        source: &[u8],
        page_index: u32,
    ) -> Result<OutputPage, PdfEngineError>;
    fn add_image_page(
        &mut self,
        image: ImageHandle,
        width_pt: f32,
        height_pt: f32,
    ) -> Result<OutputPage, PdfEngineError>;
    fn page_size(&self, page: OutputPage) -> Result<PageSize, PdfEngineError>;
    fn set_rotation(&mut self, page: OutputPage, degrees: u16) -> Result<(), PdfEngineError>;
    fn embed_font(&mut self, request: FontRequest<'_>) -> Result<FontHandle, PdfEngineError>;
    fn embed_image(&mut self, bytes: &[u8]) -> Result<ImageHandle, PdfEngineError>;
    fn draw_rectangle(
        &mut self,
        page: OutputPage,
        placement: Placement,
        color: Rgb,
        opacity: f32,
    ) -> Result<(), PdfEngineError>;
    fn draw_text(
        &mut self,
        page: OutputPage,
        placement: Placement,
        text: &str,
        style: TextStyle,
    ) -> Result<(), PdfEngineError>;
    fn draw_image(
        &mut self,
        page: OutputPage,
        image: ImageHandle,
        placement: Placement,
        opacity: f32,
    ) -> Result<(), PdfEngineError>;
    fn save(&mut self) -> Result<Vec<u8>, PdfEngineError>;
}

#[derive(Debug)]
struct PageRecord {
    id: ObjectId,
    size: PageSize,
    operations: Vec<Operation>,
    fonts: BTreeSet<usize>,
    images: BTreeSet<usize>,
    opacities: BTreeSet<u16>,
}

#[derive(Debug)]
struct FontRecord {
    font: StandardFont,
    id: ObjectId,
}

#[derive(Debug)]
struct ImageRecord {
    id: ObjectId,
}

pub struct LopdfWriter {
    doc: Document,
    pages_id: ObjectId,
    pages: Vec<PageRecord>,
    sources: HashMap<u64, Vec<ObjectId>>,
    fonts: Vec<FontRecord>,
    images: Vec<ImageRecord>,
    opacity_states: HashMap<u16, ObjectId>,
}

impl Default for LopdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        Self {
            doc,
            pages_id,
            pages: Vec::new(),
            sources: HashMap::new(),
            fonts: Vec::new(),
            images: Vec::new(),
            opacity_states: HashMap::new(),
        }
    }

    fn import_source(&mut self, key: u64, bytes: &[u8]) -> Result<&[ObjectId], PdfEngineError> {
        if !self.sources.contains_key(&key) {
            let mut source = Document::load_mem(bytes)?;
            source.renumber_objects_with(self.doc.max_id + 1);
            let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

            self.doc.objects.extend(source.objects);
            self.doc.max_id =
                self.doc.objects.keys().map(|(id, _)| *id).max().unwrap_or(self.doc.max_id);
            tracing::debug!(source = key, pages = page_ids.len(), "imported source document");
            self.sources.insert(key, page_ids);
        }

        Ok(self.sources.get(&key).map(Vec::as_slice).unwrap_or_default())
    }

    fn record_mut(&mut self, page: OutputPage) -> Result<&mut PageRecord, PdfEngineError> {
        let count = self.pages.len() as u32;
        self.pages
            .get_mut(page.0)
            .ok_or(PdfEngineError::PageOutOfRange { page: page.0 as u32, page_count: count })
    }

    fn push_page(&mut self, id: ObjectId, size: PageSize) -> OutputPage {
        self.pages.push(PageRecord {
            id,
            size,
            operations: Vec::new(),
            fonts: BTreeSet::new(),
            images: BTreeSet::new(),
            opacities: BTreeSet::new(),
        });
        OutputPage(self.pages.len() - 1)
    }

    fn opacity_key(opacity: f32) -> Option<u16> {
        let milli = (opacity.clamp(0.0, 1.0) * 1000.0).round() as u16;
        (milli < 1000).then_some(milli)
    }

    fn opacity_state(&mut self, milli: u16) -> ObjectId {
        if let Some(id) = self.opacity_states.get(&milli) {
            return *id;
        }
        let alpha = milli as f32 / 1000.0;
        let id = self.doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => alpha,
            "CA" => alpha,
        });
        self.opacity_states.insert(milli, id);
        id
    }

    fn begin_placed(record: &mut PageRecord, placement: &Placement, opacity: f32) {
        let radians = placement.rotation_deg.to_radians();
        let (sin, cos) = radians.sin_cos();
        record.operations.push(Operation::new("q", vec![]));
        if let Some(milli) = Self::opacity_key(opacity) {
            record.opacities.insert(milli);
            record
                .operations
                .push(Operation::new("gs", vec![Object::Name(opacity_name(milli).into_bytes())]));
        }
        record.operations.push(Operation::new(
            "cm",
            vec![
                cos.into(),
                sin.into(),
                (-sin).into(),
                cos.into(),
                placement.x.into(),
                placement.y.into(),
            ],
        ));
    }

    fn flush_page(
        &mut self,
        index: usize,
        wrap: (ObjectId, ObjectId),
    ) -> Result<(), PdfEngineError> {
        let operations = std::mem::take(&mut self.pages[index].operations);
        let fonts: Vec<usize> = self.pages[index].fonts.iter().copied().collect();
        let images: Vec<usize> = self.pages[index].images.iter().copied().collect();
        let opacities: Vec<u16> = self.pages[index].opacities.iter().copied().collect();
        let page_id = self.pages[index].id;

        if operations.is_empty() {
            return Ok(());
        }

        let data = Content { operations }.encode()?;
        let overlay_id = self.doc.add_object(Stream::new(dictionary! {}, data));

        let mut font_entries = Vec::new();
        for index in fonts {
            font_entries.push((font_name(index), self.fonts[index].id));
        }
        let mut image_entries = Vec::new();
        for index in images {
            image_entries.push((image_name(index), self.images[index].id));
        }
        let mut state_entries = Vec::new();
        for milli in opacities {
            state_entries.push((opacity_name(milli), self.opacity_state(milli)));
        }

        let resources = {
            let page = self.doc.get_dictionary(page_id)?;
            let mut resources = match page.get(b"Resources") {
                Ok(Object::Dictionary(dict)) => dict.clone(),
                Ok(Object::Reference(id)) => self.doc.get_dictionary(*id)?.clone(),
                _ => Dictionary::new(),
            };
            merge_resource(&self.doc, &mut resources, b"Font", font_entries)?;
            merge_resource(&self.doc, &mut resources, b"XObject", image_entries)?;
            merge_resource(&self.doc, &mut resources, b"ExtGState", state_entries)?;
            resources
        };

        let page = self.doc.get_object_mut(page_id)?.as_dict_mut()?;
        let mut contents = vec![Object::Reference(wrap.0)];
        match page.get(b"Contents") {
            Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
            Ok(other) => contents.push(other.clone()),
            Err(_) => {}
        }
        contents.push(Object::Reference(wrap.1));
        contents.push(Object::Reference(overlay_id));
        page.set("Contents", contents);
        page.set("Resources", resources);

        Ok(())
    }
}

fn font_name(index: usize) -> String {
    format!("FolioF{}", index + 1)
}

fn image_name(index: usize) -> String {
    format!("FolioIm{}", index + 1)
}

fn opacity_name(milli: u16) -> String {
    format!("FolioGs{milli}")
}

fn merge_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    entries: Vec<(String, ObjectId)>,
) -> Result<(), PdfEngineError> {
    if entries.is_empty() {
        return Ok(());
    }
    let mut dict = match resources.get(category) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id)?.clone(),
        _ => Dictionary::new(),
    };
    for (name, id) in entries {
        dict.set(name, id);
    }
    resources.set(category.to_vec(), dict);
    Ok(())
}

/// WinAnsi bytes for the standard fonts; unmappable characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch as u32 {
            code @ 0x20..=0x7e => code as u8,
            code @ 0xa0..=0xff => code as u8,
            0x2013 => 0x96,
            0x2014 => 0x97,
            0x2018 => 0x91,
            0x2019 => 0x92,
            0x201c => 0x93,
            0x201d => 0x94,
            0x20ac => 0x80,
            _ => b'?',
        })
        .collect()
}

impl DocumentWriter for LopdfWriter {
    fn copy_page(
        &mut self,
        source_key: u64,
        source: &[u8],
        page_index: u32,
    ) -> Result<OutputPage, PdfEngineError> {
        let page_ids = self.import_source(source_key, source)?;
        let source_page = *page_ids.get(page_index as usize).ok_or(
            PdfEngineError::PageOutOfRange { page: page_index, page_count: page_ids.len() as u32 },
        )?;

        let original = self.doc.get_dictionary(source_page)?;
        let size = page_size_of(&self.doc, original);
        let mut page = original.clone();
        let inheritable: [&[u8]; 3] = [b"MediaBox", b"CropBox", b"Resources"];
        for key in inheritable {
            if page.get(key).is_err() {
                if let Some(value) = inherited_attribute(&self.doc, original, key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        let shared_resources = match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        if let Some(id) = shared_resources {
            let resolved = self.doc.get_dictionary(id)?.clone();
            page.set("Resources", resolved);
        }
        page.remove(b"Annots");
        page.remove(b"StructParents");
        page.set("Parent", self.pages_id);
        page.set("Rotate", size.rotation as i64);

        let id = self.doc.add_object(page);
        Ok(self.push_page(id, size))
    }

    fn add_image_page(
        &mut self,
        image: ImageHandle,
        width_pt: f32,
        height_pt: f32,
    ) -> Result<OutputPage, PdfEngineError> {
        let id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
            "Resources" => dictionary! {},
        });
        let page = self.push_page(id, PageSize { width_pt, height_pt, rotation: 0 });
        self.draw_image(
            page,
            image,
            Placement { x: 0.0, y: 0.0, width: width_pt, height: height_pt, rotation_deg: 0.0 },
            1.0,
        )?;
        Ok(page)
    }

    fn page_size(&self, page: OutputPage) -> Result<PageSize, PdfEngineError> {
        self.pages.get(page.0).map(|record| record.size).ok_or(PdfEngineError::PageOutOfRange {
            page: page.0 as u32,
            page_count: self.pages.len() as u32,
        })
    }

    fn set_rotation(&mut self, page: OutputPage, degrees: u16) -> Result<(), PdfEngineError> {
        let degrees = normalize_rotation(degrees as i32);
        let record = self.record_mut(page)?;
        record.size.rotation = degrees;
        let id = record.id;
        self.doc.get_object_mut(id)?.as_dict_mut()?.set("Rotate", degrees as i64);
        Ok(())
    }

    fn embed_font(&mut self, request: FontRequest<'_>) -> Result<FontHandle, PdfEngineError> {
        let font = match request {
            FontRequest::Standard(font) => font,
            FontRequest::Embedded { name, .. } => {
                return Err(PdfEngineError::FontUnavailable(name.to_owned()));
            }
        };

        if let Some(index) = self.fonts.iter().position(|record| record.font == font) {
            return Ok(FontHandle(index));
        }

        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.fonts.push(FontRecord { font, id });
        Ok(FontHandle(self.fonts.len() - 1))
    }

    fn embed_image(&mut self, bytes: &[u8]) -> Result<ImageHandle, PdfEngineError> {
        let info = codec::probe(bytes)?;
        let id = match info.format {
            RasterFormat::Jpeg => {
                let color = image::load_from_memory(bytes)?.color();
                let color_space =
                    if color.channel_count() == 1 { "DeviceGray" } else { "DeviceRGB" };
                self.doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => info.width as i64,
                        "Height" => info.height as i64,
                        "ColorSpace" => color_space,
                        "BitsPerComponent" => 8,
                        "Filter" => "DCTDecode",
                    },
                    bytes.to_vec(),
                ))
            }
            RasterFormat::Png => {
                let rgba = codec::decode_rgba(bytes)?;
                let mut rgb = Vec::with_capacity((info.width * info.height * 3) as usize);
                let mut alpha = Vec::with_capacity((info.width * info.height) as usize);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel.0[3]);
                }

                let mut dict = dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => info.width as i64,
                    "Height" => info.height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                };
                if info.has_alpha {
                    let mask_id = self.doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => info.width as i64,
                            "Height" => info.height as i64,
                            "ColorSpace" => "DeviceGray",
                            "BitsPerComponent" => 8,
                        },
                        alpha,
                    ));
                    dict.set("SMask", mask_id);
                }
                self.doc.add_object(Stream::new(dict, rgb))
            }
        };

        self.images.push(ImageRecord { id });
        Ok(ImageHandle(self.images.len() - 1))
    }

    fn draw_rectangle(
        &mut self,
        page: OutputPage,
        placement: Placement,
        color: Rgb,
        opacity: f32,
    ) -> Result<(), PdfEngineError> {
        let record = self.record_mut(page)?;
        Self::begin_placed(record, &placement, opacity);
        record.operations.extend([
            Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()]),
            Operation::new(
                "re",
                vec![0.into(), 0.into(), placement.width.into(), placement.height.into()],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_text(
        &mut self,
        page: OutputPage,
        placement: Placement,
        text: &str,
        style: TextStyle,
    ) -> Result<(), PdfEngineError> {
        if style.font.0 >= self.fonts.len() {
            return Err(PdfEngineError::Backend(format!("unknown font handle {}", style.font.0)));
        }
        let record = self.record_mut(page)?;
        record.fonts.insert(style.font.0);
        Self::begin_placed(record, &placement, style.opacity);
        record.operations.extend([
            Operation::new(
                "rg",
                vec![style.color.r.into(), style.color.g.into(), style.color.b.into()],
            ),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_name(style.font.0).into_bytes()), style.size.into()],
            ),
            Operation::new("Td", vec![0.into(), 0.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_image(
        &mut self,
        page: OutputPage,
        image: ImageHandle,
        placement: Placement,
        opacity: f32,
    ) -> Result<(), PdfEngineError> {
        if image.0 >= self.images.len() {
            return Err(PdfEngineError::Backend(format!("unknown image handle {}", image.0)));
        }
        let record = self.record_mut(page)?;
        record.images.insert(image.0);
        Self::begin_placed(record, &placement, opacity);
        record.operations.extend([
            Operation::new(
                "cm",
                vec![
                    placement.width.into(),
                    0.into(),
                    0.into(),
                    placement.height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name(image.0).into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>, PdfEngineError> {
        let save_state = self.doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let restore_state = self.doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));
        for index in 0..self.pages.len() {
            self.flush_page(index, (save_state, restore_state))?;
        }

        let kids: Vec<Object> =
            self.pages.iter().map(|record| Object::Reference(record.id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer = Dictionary::new();
        self.doc.trailer.set("Root", catalog_id);
        let pruned = self.doc.prune_objects();
        tracing::debug!(pages = count, pruned = pruned.len(), "saving output document");

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blank_pdf, LopdfEngine, OpenSource, PdfEngine};

    fn reopen(bytes: Vec<u8>) -> (LopdfEngine, crate::DocumentHandle) {
        let mut engine = LopdfEngine::new();
        let handle = engine.open(OpenSource::Bytes(bytes)).expect("output should parse");
        (engine, handle)
    }

    #[test]
    fn copies_pages_across_sources_in_order() {
        let first = blank_pdf(&[(100.0, 200.0), (300.0, 400.0)]).expect("fixture");
        let second = blank_pdf(&[(50.0, 60.0)]).expect("fixture");

        let mut writer = LopdfWriter::new();
        writer.copy_page(1, &first, 1).expect("copy should succeed");
        writer.copy_page(2, &second, 0).expect("copy should succeed");
        writer.copy_page(1, &first, 0).expect("copy should succeed");
        let bytes = writer.save().expect("save should succeed");

        let (engine, handle) = reopen(bytes);
        assert_eq!(engine.page_count(handle).expect("count"), 3);
        let sizes: Vec<(f32, f32)> = (0..3)
            .map(|index| {
                let size = engine.page_size(handle, index).expect("size");
                (size.width_pt, size.height_pt)
            })
            .collect();
        assert_eq!(sizes, vec![(300.0, 400.0), (50.0, 60.0), (100.0, 200.0)]);
    }

    #[test]
    fn rotation_is_written_to_the_page() {
        let source = blank_pdf(&[(100.0, 200.0)]).expect("fixture");
        let mut writer = LopdfWriter::new();
        let page = writer.copy_page(1, &source, 0).expect("copy should succeed");
        writer.set_rotation(page, 270).expect("rotate should succeed");

        let (engine, handle) = reopen(writer.save().expect("save should succeed"));
        assert_eq!(engine.page_size(handle, 0).expect("size").rotation, 270);
    }

    #[test]
    fn overlay_primitives_produce_resources() {
        let source = blank_pdf(&[(200.0, 200.0)]).expect("fixture");
        let mut writer = LopdfWriter::new();
        let page = writer.copy_page(1, &source, 0).expect("copy should succeed");
        let font = writer
            .embed_font(FontRequest::Standard(StandardFont::Helvetica))
            .expect("standard font should embed");
        let placement =
            Placement { x: 10.0, y: 20.0, width: 30.0, height: 40.0, rotation_deg: 0.0 };

        writer.draw_rectangle(page, placement, Rgb::WHITE, 1.0).expect("rect");
        writer
            .draw_text(
                page,
                placement,
                "Hello (world)",
                TextStyle { font, size: 12.0, color: Rgb::BLACK, opacity: 0.5 },
            )
            .expect("text");
        let bytes = writer.save().expect("save should succeed");

        let doc = Document::load_mem(&bytes).expect("output should parse");
        let page_id = *doc.get_pages().values().next().expect("one page");
        let page = doc.get_dictionary(page_id).expect("page dict");
        let resources = page.get(b"Resources").and_then(Object::as_dict).expect("resources");
        assert!(resources.get(b"Font").is_ok());
        assert!(resources.get(b"ExtGState").is_ok());
    }

    #[test]
    fn embedded_fonts_are_reported_unavailable() {
        let mut writer = LopdfWriter::new();
        let err = writer
            .embed_font(FontRequest::Embedded { name: "Custom", bytes: &[] })
            .expect_err("embedding should be unsupported");

        assert!(matches!(err, PdfEngineError::FontUnavailable(name) if name == "Custom"));
    }

    #[test]
    fn win_ansi_maps_latin1_and_replaces_the_rest() {
        assert_eq!(encode_win_ansi("Aé€✓"), vec![b'A', 0xe9, 0x80, b'?']);
    }
}

use crate::codec::write_string;
use crate::version::ProtocolVersion;
use bytes::BytesMut;
use parapet_nbt::{NbtRoot, NbtValue};
use parapet_types::TextComponent;

/// Write a text component in the format the revision expects:
/// a JSON string before 1.20.3, nameless NBT from 1.20.3 on.
pub fn write_component(buf: &mut BytesMut, component: &TextComponent, version: ProtocolVersion) {
    if version >= ProtocolVersion::V1_20_3 {
        component_to_nbt(component).write_root(NbtRoot::Nameless, buf);
    } else {
        write_string(buf, &component.to_json());
    }
}

/// Login-phase components are always JSON, on every revision.
pub fn write_json_component(buf: &mut BytesMut, component: &TextComponent) {
    write_string(buf, &component.to_json());
}

pub fn component_to_nbt(component: &TextComponent) -> NbtValue {
    let mut nbt = NbtValue::Compound(vec![("text".into(), component.text.as_str().into())]);
    if let Some(color) = &component.color {
        nbt.insert("color", color.as_str());
    }
    if let Some(bold) = component.bold {
        nbt.insert("bold", bold);
    }
    if let Some(italic) = component.italic {
        nbt.insert("italic", italic);
    }
    if !component.extra.is_empty() {
        nbt.insert(
            "extra",
            NbtValue::List(component.extra.iter().map(component_to_nbt).collect()),
        );
    }
    nbt
}

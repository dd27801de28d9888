//! End-to-end patch runs: rule files on disk, through `repatch-data`
//! loading, a full coordinator run, and the per-version wire forms the
//! host receives at commit.

use std::fs;
use std::path::{Path, PathBuf};

use repatch_core::coordinate::PatchCoordinator;
use repatch_core::recipe::{RawRecipe, VersionTag};
use repatch_core::test_utils::{MemoryHost, rid};
use serde_json::json;

fn make_rule_dir(suffix: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "repatch_e2e_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

const REFINE_IRON: &str = r#"[{
    "matches": { "type": "result_item_is", "item": "minecraft:iron_ingot" },
    "edits": [{ "type": "replace_result", "item": "modid:refined_iron" }]
}]"#;

/// Iron ore smelting in each supported version's wire form.
fn smelting_for(version: VersionTag) -> RawRecipe {
    let payload = match version {
        VersionTag::V1_20_1 => json!({
            "type": "minecraft:smelting",
            "ingredient": { "item": "minecraft:iron_ore" },
            "result": "minecraft:iron_ingot",
            "experience": 0.7,
            "cookingtime": 200
        }),
        VersionTag::V1_21_1 => json!({
            "type": "minecraft:smelting",
            "ingredient": { "item": "minecraft:iron_ore" },
            "result": { "id": "minecraft:iron_ingot" },
            "experience": 0.7,
            "cookingtime": 200
        }),
        VersionTag::V1_21_4 => json!({
            "type": "minecraft:smelting",
            "ingredient": "minecraft:iron_ore",
            "result": { "id": "minecraft:iron_ingot" },
            "experience": 0.7,
            "cookingtime": 200
        }),
    };
    RawRecipe::new(version, payload)
}

#[test]
fn replace_output_lands_in_each_version_wire_form() {
    let dir = make_rule_dir("per_version", &[("refine_iron.json", REFINE_IRON)]);
    let rules = repatch_data::load_rule_set(&dir).unwrap();
    let coordinator = PatchCoordinator::new(rules);

    for version in [
        VersionTag::V1_20_1,
        VersionTag::V1_21_1,
        VersionTag::V1_21_4,
    ] {
        let mut host = MemoryHost::new();
        host.insert(rid("minecraft:iron_ingot_from_smelting"), smelting_for(version));

        let report = coordinator.run(&mut host).unwrap();
        assert_eq!(report.modified(), 1, "for {}", version.as_str());
        assert!(report.diagnostics.is_empty());

        let patched = host
            .recipe(&rid("minecraft:iron_ingot_from_smelting"))
            .unwrap();
        assert_eq!(patched.version, version);
        match version {
            // Count-1 furnace results stay in the 1.20.1 bare-string form.
            VersionTag::V1_20_1 => {
                assert_eq!(patched.payload["result"], json!("modid:refined_iron"));
            }
            VersionTag::V1_21_1 | VersionTag::V1_21_4 => {
                assert_eq!(
                    patched.payload["result"],
                    json!({ "id": "modid:refined_iron" })
                );
            }
        }
        // Fields the engine does not model ride through unchanged.
        assert_eq!(patched.payload["experience"], json!(0.7));
        assert_eq!(patched.payload["cookingtime"], json!(200));
    }

    cleanup(&dir);
}

#[test]
fn untouched_recipes_keep_their_exact_payload_bytes() {
    let dir = make_rule_dir("untouched", &[("refine_iron.json", REFINE_IRON)]);
    let rules = repatch_data::load_rule_set(&dir).unwrap();
    let coordinator = PatchCoordinator::new(rules);

    let tnt = RawRecipe::new(
        VersionTag::V1_20_1,
        json!({
            "type": "minecraft:crafting_shapeless",
            "ingredients": [
                { "item": "minecraft:gunpowder" },
                { "item": "minecraft:sand" }
            ],
            "result": { "item": "minecraft:tnt" },
            "group": "explosives"
        }),
    );
    let mut host = MemoryHost::new();
    host.insert(rid("minecraft:tnt"), tnt.clone());

    let report = coordinator.run(&mut host).unwrap();
    assert_eq!(report.unchanged(), 1);
    // Not re-encoded: the committed payload is the snapshot payload.
    assert_eq!(host.recipe(&rid("minecraft:tnt")).unwrap().payload, tnt.payload);

    cleanup(&dir);
}

#[test]
fn tag_alternative_rule_patches_shaped_recipe() {
    let rule = r##"[{
        "matches": { "type": "accepts_ingredient", "ingredient": "#minecraft:planks" },
        "edits": [{
            "type": "add_alternative",
            "selector": "#minecraft:planks",
            "value": "modid:hardwood"
        }]
    }]"##;
    let dir = make_rule_dir("tag_alt", &[("hardwood.json", rule)]);
    let rules = repatch_data::load_rule_set(&dir).unwrap();
    let coordinator = PatchCoordinator::new(rules);

    let raw = RawRecipe::new(
        VersionTag::V1_20_1,
        json!({
            "type": "minecraft:crafting_shaped",
            "pattern": ["##", "##"],
            "key": { "#": { "tag": "minecraft:planks" } },
            "result": { "item": "minecraft:crafting_table" }
        }),
    );
    let mut host = MemoryHost::new();
    host.insert(rid("minecraft:crafting_table"), raw);

    let report = coordinator.run(&mut host).unwrap();
    assert_eq!(report.modified(), 1);

    let patched = host.recipe(&rid("minecraft:crafting_table")).unwrap();
    // The slot gained an alternative, so it emits as an array; the opaque
    // pattern is preserved.
    assert_eq!(
        patched.payload["key"]["#"],
        json!([{ "tag": "minecraft:planks" }, { "item": "modid:hardwood" }])
    );
    assert_eq!(patched.payload["pattern"], json!(["##", "##"]));

    cleanup(&dir);
}

#[test]
fn delete_rule_removes_recipe_from_registry() {
    let rule = r#"[{
        "target_recipes": "minecraft:tnt",
        "modifiers": [{ "type": "delete_recipe" }]
    }]"#;
    let dir = make_rule_dir("delete", &[("no_tnt.json", rule)]);
    let rules = repatch_data::load_rule_set(&dir).unwrap();
    let coordinator = PatchCoordinator::new(rules);

    let mut host = MemoryHost::new();
    host.insert(
        rid("minecraft:tnt"),
        RawRecipe::new(
            VersionTag::V1_21_1,
            json!({
                "type": "minecraft:crafting_shapeless",
                "ingredients": [{ "item": "minecraft:gunpowder" }],
                "result": { "id": "minecraft:tnt" }
            }),
        ),
    );

    let report = coordinator.run(&mut host).unwrap();
    assert_eq!(report.deleted(), 1);
    assert!(host.recipe(&rid("minecraft:tnt")).is_none());

    cleanup(&dir);
}

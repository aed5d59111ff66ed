// Game data shared by use-case tests.

use crate::domain::GameData;

pub(crate) const WORLD_TOML: &str = r#"
    [world]
    player_spawn = { x = 0.0, y = 0.0, z = 0.0 }

    [classes.warrior]
    base_health = 100
    health_per_level = 20
    base_mana = 50
    mana_per_level = 5
    base_attack = 10.0
    base_defense = 5.0
    attack_speed = 1.5
    move_speed = 5.0
    base_stats = { strength = 10, dexterity = 20, intelligence = 2, vitality = 8 }
    growth = { strength = 2, dexterity = 1, intelligence = 0, vitality = 2 }
    starting_skills = ["bash", "cleave", "war_cry", "second_wind"]
    starting_items = [{ item = "potion", quantity = 3 }, { item = "herb", quantity = 1 }]

    [[monsters]]
    id = "wolf"
    name = "Wolf"
    level = 3
    max_health = 100
    attack = 12.0
    defense = 5.0
    move_speed = 4.0
    attack_speed = 2.0
    aggro_range = 8.0
    experience = 40
    patrol = { kind = "wander", radius = 4.0 }

    [[skills]]
    id = "bash"
    name = "Bash"
    mana_cost = 5
    cooldown_seconds = 4.0
    range = 3.5
    target = { kind = "enemy" }
    effect = { kind = "damage", base = 15.0, scaling = { strength = 1.5 } }

    [[skills]]
    id = "cleave"
    name = "Cleave"
    health_cost = 10
    cooldown_seconds = 6.0
    range = 3.5
    target = { kind = "enemy_area", radius = 5.0, max_targets = 2 }
    effect = { kind = "damage", base = 10.0, scaling = { strength = 1.0 } }

    [[skills]]
    id = "war_cry"
    name = "War Cry"
    mana_cost = 10
    cooldown_seconds = 20.0
    target = { kind = "caster" }
    effect = { kind = "buff", stat = "attack", magnitude = 10.0, duration_seconds = 5.0 }

    [[skills]]
    id = "second_wind"
    name = "Second Wind"
    mana_cost = 20
    cooldown_seconds = 30.0
    range = 10.0
    target = { kind = "ally" }
    effect = { kind = "heal", base = 30.0, scaling = { vitality = 1.0 } }

    [[skills]]
    id = "fireball"
    name = "Fireball"
    mana_cost = 15
    cooldown_seconds = 3.0
    range = 12.0
    target = { kind = "enemy" }
    effect = { kind = "damage", base = 25.0, scaling = { intelligence = 2.0 } }

    [[skills]]
    id = "aimed_shot"
    name = "Aimed Shot"
    mana_cost = 5
    cooldown_seconds = 2.0
    range = 18.0
    target = { kind = "enemy" }
    effect = { kind = "damage", base = 20.0, scaling = { dexterity = 1.0 } }

    [[items]]
    id = "potion"
    name = "Potion"
    kind = { kind = "consumable", heal_health = 50, cooldown_seconds = 2.0 }

    [[items]]
    id = "herb"
    name = "Herb"
    kind = { kind = "material" }

    [[spawn_areas]]
    id = "forest"
    shape = { kind = "circle", radius = 10.0 }
    center = { x = 20.0, y = 0.0, z = 20.0 }
    populations = [{ monster = "wolf", count = 4 }]
"#;

pub(crate) fn game_data() -> GameData {
    GameData::from_toml_str(WORLD_TOML).expect("test game data should load")
}

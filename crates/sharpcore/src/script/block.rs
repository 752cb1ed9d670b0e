//! `{+ ... }` 嵌入區塊
//!
//! 區塊內容為 Lua 程式碼，使用 mlua 執行。可用的 API：
//! - `mud.send(cmd)` / `mud.echo(text)` / `mud.say(text)` / `mud.feed(channel, text)`
//! - `vars`：變數表的副本，修改會在下一條指令開始時寫回
//! - `args`：最近一次匹配的數字捕獲群組

use mlua::{FromLua, IntoLua, Lua, Table, Value as LuaValue};
use tracing::debug;

use super::runner::{Effect, ExecContext};
use super::ScriptError;

/// 執行一段 Lua 區塊，將結果轉為副作用與變數寫入
pub(crate) fn run_block(source: &str, ctx: &mut ExecContext<'_>) -> Result<(), ScriptError> {
    let lua = Lua::new();

    // mud 表與收集結果用的列表
    let mud = lua.create_table()?;
    for list in ["commands", "echos", "speech", "feeds"] {
        mud.set(list, lua.create_table()?)?;
    }

    mud.set(
        "send",
        lua.create_function(|lua, cmd: String| append(lua, "commands", cmd))?,
    )?;
    mud.set(
        "echo",
        lua.create_function(|lua, text: String| append(lua, "echos", text))?,
    )?;
    mud.set(
        "say",
        lua.create_function(|lua, text: String| append(lua, "speech", text))?,
    )?;
    mud.set(
        "feed",
        lua.create_function(|lua, (channel, text): (String, String)| {
            let pair = lua.create_table()?;
            pair.set(1, channel)?;
            pair.set(2, text)?;
            append(lua, "feeds", pair)
        })?,
    )?;
    lua.globals().set("mud", mud)?;

    // 變數表
    let vars = lua.create_table()?;
    for (name, value) in ctx.locals().iter() {
        vars.set(name, value)?;
    }
    lua.globals().set("vars", vars)?;

    let args = lua.create_table()?;
    for (index, value) in ctx.locals().args() {
        match index.parse::<i64>() {
            Ok(i) => args.set(i, value.as_str())?,
            Err(_) => args.set(index.as_str(), value.as_str())?,
        }
    }
    lua.globals().set("args", args)?;

    lua.load(source).set_name("block").exec()?;

    // 收集結果
    let mud: Table = lua.globals().get("mud")?;

    let commands: Table = mud.get("commands")?;
    for cmd in commands.sequence_values::<String>().flatten() {
        ctx.emit(Effect::Send(cmd));
    }

    let echos: Table = mud.get("echos")?;
    for text in echos.sequence_values::<String>().flatten() {
        ctx.emit(Effect::Display(text));
    }

    let speech: Table = mud.get("speech")?;
    for text in speech.sequence_values::<String>().flatten() {
        ctx.emit(Effect::Speak {
            text,
            interrupt: false,
        });
    }

    let feeds: Table = mud.get("feeds")?;
    for pair in feeds.sequence_values::<Table>().flatten() {
        if let (Ok(channel), Ok(message)) = (pair.get::<String>(1), pair.get::<String>(2)) {
            ctx.emit(Effect::Feed { channel, message });
        }
    }

    // 寫回變數：新增/修改排入寫入，消失的排入刪除
    // 數字與布林值轉為文字；無法轉換的值（表、函式）保留原變數
    let vars: Table = lua.globals().get("vars")?;
    let mut seen = Vec::new();
    for (name, value) in vars.pairs::<String, LuaValue>().flatten() {
        match lua_text(&lua, value) {
            Some(text) if ctx.locals().get(&name) != Some(text.as_str()) => {
                ctx.set_var(name.clone(), text);
            }
            Some(_) => {}
            None => debug!(variable = %name, "Lua 變數無法轉為文字，略過"),
        }
        seen.push(name);
    }
    let removed: Vec<String> = ctx
        .locals()
        .iter()
        .map(|(name, _)| name.to_string())
        .filter(|name| !seen.contains(name))
        .collect();
    for name in removed {
        ctx.delete_var(name);
    }

    Ok(())
}

/// 依 Lua `tostring` 的規則轉換字串、數字與布林值
fn lua_text(lua: &Lua, value: LuaValue) -> Option<String> {
    match value {
        LuaValue::Boolean(flag) => Some(flag.to_string()),
        LuaValue::String(_) | LuaValue::Integer(_) | LuaValue::Number(_) => {
            String::from_lua(value, lua).ok()
        }
        _ => None,
    }
}

/// 在 `mud.<list>` 尾端加入一個值
fn append(lua: &Lua, list: &str, value: impl IntoLua) -> mlua::Result<()> {
    let mud: Table = lua.globals().get("mud")?;
    let items: Table = mud.get(list)?;
    let len = items.len()? + 1;
    items.set(len, value)
}

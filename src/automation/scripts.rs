//! PowerShell payloads for the automation surface.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encode a script for `powershell -EncodedCommand` (UTF-16LE, base64).
pub fn encode_command(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    STANDARD.encode(bytes)
}

/// Escape text for a single-quoted PowerShell literal.
pub fn escape_single_quoted(value: &str) -> String {
    value.replace('\'', "''")
}

/// Escape literal text for `WScript.Shell.SendKeys`.
///
/// Newlines become `{ENTER}`, carriage returns are dropped and SendKeys
/// metacharacters are wrapped in braces.
pub fn escape_send_keys(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\r' => {}
            '\n' => out.push_str("{ENTER}"),
            '+' | '^' | '%' | '~' | '(' | ')' | '{' | '}' | '[' | ']' => {
                out.push('{');
                out.push(ch);
                out.push('}');
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Send one already-escaped SendKeys token.
pub fn send_key(token: &str) -> String {
    format!(
        "$ws = New-Object -ComObject WScript.Shell\n\
         $token = '{}'\n\
         Start-Sleep -Milliseconds 80\n\
         $ws.SendKeys($token)\n",
        escape_single_quoted(token)
    )
}

/// Send each character in turn with `delay_ms` between them.
pub fn send_macro(keys: &[char], delay_ms: u64) -> String {
    let tokens = keys
        .iter()
        .map(|c| format!("'{}'", escape_single_quoted(&escape_send_keys(&c.to_string()))))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "$ws = New-Object -ComObject WScript.Shell\n\
         $keys = @({tokens})\n\
         Start-Sleep -Milliseconds 80\n\
         foreach ($k in $keys) {{\n  $ws.SendKeys($k)\n  Start-Sleep -Milliseconds {delay_ms}\n}}\n"
    )
}

/// Type `text` in one SendKeys call.
pub fn send_text(text: &str) -> String {
    format!(
        "$ws = New-Object -ComObject WScript.Shell\n\
         $text = '{}'\n\
         Start-Sleep -Milliseconds 80\n\
         $ws.SendKeys($text)\n",
        escape_single_quoted(&escape_send_keys(text))
    )
}

/// Print the target of a `.lnk` shortcut.
pub fn resolve_shortcut(path: &str) -> String {
    format!(
        "$wsh = New-Object -ComObject WScript.Shell\n\
         $sc = $wsh.CreateShortcut('{}')\n\
         $target = $sc.TargetPath\n\
         if ($target) {{ $target }}\n",
        escape_single_quoted(path)
    )
}

/// Print the associated icon of `path` as base64 PNG.
pub fn extract_icon(path: &str) -> String {
    format!(
        "Add-Type -AssemblyName System.Drawing\n\
         $path='{}'\n\
         if (-not (Test-Path $path)) {{ exit 1 }}\n\
         $icon=[System.Drawing.Icon]::ExtractAssociatedIcon($path)\n\
         if ($null -eq $icon) {{ exit 1 }}\n\
         $bmp=$icon.ToBitmap()\n\
         $ms=New-Object System.IO.MemoryStream\n\
         $bmp.Save($ms, [System.Drawing.Imaging.ImageFormat]::Png)\n\
         [Convert]::ToBase64String($ms.ToArray())\n\
         $ms.Dispose()\n\
         $bmp.Dispose()\n\
         $icon.Dispose()\n",
        escape_single_quoted(path)
    )
}

/// Print installed applications as compact JSON `[{name, command}]`.
///
/// Sources are the uninstall registry keys and Start Menu shortcuts; system
/// components, uninstallers and updaters are filtered out and a shortcut
/// wins over a registry entry of the same name.
pub const APP_DISCOVERY: &str = r##"
$ErrorActionPreference = 'SilentlyContinue'
$appsByName = @{}

function Normalize-Cmd([string]$cmd) {
  if ([string]::IsNullOrWhiteSpace($cmd)) { return '' }
  $x = $cmd.Trim()
  if ($x.Contains(',')) { $x = $x.Split(',')[0] }
  $x = $x.Trim('"').Trim()
  return $x
}

function Is-BaseWindowsApp([string]$name, [string]$publisher, [string]$cmd, [string]$source) {
  $n = ($name + ' ' + $publisher).ToLower()
  if ($source -eq 'registry' -and $n -match 'microsoft') { return $true }
  if ($n -match 'windows defender|windows update|edgewebview|webview2|xbox|onenote|onedrive|cortana|runtime|redistributable') { return $true }
  if ($name -match 'Windows Tools|Administrative Tools|Startup') { return $true }
  if (($cmd.ToLower() -notmatch '\.lnk$') -and $cmd.ToLower().StartsWith($env:WINDIR.ToLower())) { return $true }
  return $false
}

function Is-InterestingApp([string]$name, [string]$cmd) {
  $n = $name.ToLower()
  $c = $cmd.ToLower().Trim('"')
  $file = [System.IO.Path]::GetFileName($c).ToLower()
  if ($n -match 'uninstall|updater|update|helper|service|crash|report|diagnostic|setup|installer') { return $false }
  if ($file -match '^unins[0-9]*\.exe$|uninstall|setup|installer|updater|update|helper|service|crash') { return $false }
  if ($c -match '\\uninstall(ers)?\\|\\installer\\|\\setup\\') { return $false }
  return $true
}

function Add-App([string]$name, [string]$cmd, [string]$publisher, [string]$source) {
  if ([string]::IsNullOrWhiteSpace($name)) { return }
  $norm = Normalize-Cmd $cmd
  if ([string]::IsNullOrWhiteSpace($norm)) { return }
  if ($norm -notmatch '\.(exe|lnk)$') { return }
  if (Is-BaseWindowsApp $name $publisher $norm $source) { return }
  if (-not (Is-InterestingApp $name $norm)) { return }
  if ($norm.Contains(' ')) { $norm = '"' + $norm + '"' }

  $key = $name.Trim().ToLower()
  $priority = if ($norm.ToLower().EndsWith('.lnk"') -or $norm.ToLower().EndsWith('.lnk')) { 2 } else { 1 }
  $candidate = [PSCustomObject]@{ name = $name.Trim(); command = $norm; priority = $priority }

  if (-not $appsByName.ContainsKey($key) -or $candidate.priority -gt $appsByName[$key].priority) {
    $appsByName[$key] = $candidate
  }
}

$regPaths = @(
  'HKLM:\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\*',
  'HKLM:\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall\*',
  'HKCU:\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\*'
)
foreach ($path in $regPaths) {
  Get-ItemProperty $path | ForEach-Object {
    $cmd = Normalize-Cmd $_.DisplayIcon
    if ([string]::IsNullOrWhiteSpace($cmd)) {
      $u = Normalize-Cmd $_.UninstallString
      if ($u -match '\.exe$') { $cmd = $u }
    }
    Add-App $_.DisplayName $cmd $_.Publisher 'registry'
  }
}

$shortcutRoots = @(
  "$env:ProgramData\Microsoft\Windows\Start Menu\Programs",
  "$env:APPDATA\Microsoft\Windows\Start Menu\Programs"
)
foreach ($root in $shortcutRoots) {
  if (-not (Test-Path $root)) { continue }
  Get-ChildItem -Path $root -Recurse -Filter *.lnk | ForEach-Object {
    Add-App ([System.IO.Path]::GetFileNameWithoutExtension($_.Name)) $_.FullName '' 'startmenu'
  }
}

$appsByName.Values | Sort-Object name | Select-Object name, command | ConvertTo-Json -Compress
"##;

/// Change the volume of every audio session whose process name matches
/// `-Target` by `-Step` (a fraction of full scale). Prints
/// `{"ok":true,"sessions":n,"volume":pct}` or `{"ok":false,"reason":...}`.
///
/// Matching is substring containment in either direction, so `code` and
/// `vscode` match each other.
pub const VOLUME_ADJUST: &str = r##"
param(
  [Parameter(Mandatory = $true)][string]$Target,
  [Parameter(Mandatory = $true)][double]$Step
)

$ErrorActionPreference = 'Stop'

Add-Type -TypeDefinition @"
using System;
using System.Runtime.InteropServices;

public enum EDataFlow { eRender = 0, eCapture = 1, eAll = 2 }
public enum ERole { eConsole = 0, eMultimedia = 1, eCommunications = 2 }

[Guid("A95664D2-9614-4F35-A746-DE8DB63617E6"), InterfaceType(ComInterfaceType.InterfaceIsIUnknown)]
interface IMMDeviceEnumerator {
  int NotImpl1();
  int GetDefaultAudioEndpoint(EDataFlow dataFlow, ERole role, out IMMDevice ppDevice);
}

[Guid("D666063F-1587-4E43-81F1-B948E807363F"), InterfaceType(ComInterfaceType.InterfaceIsIUnknown)]
interface IMMDevice {
  int Activate(ref Guid iid, int dwClsCtx, IntPtr pActivationParams, out object ppInterface);
}

[Guid("77AA99A0-1BD6-484F-8BC7-2C654C9A9B6F"), InterfaceType(ComInterfaceType.InterfaceIsIUnknown)]
interface IAudioSessionManager2 {
  int NotImpl1();
  int NotImpl2();
  int GetSessionEnumerator(out IAudioSessionEnumerator SessionEnum);
}

[Guid("E2F5BB11-0570-40CA-ACDD-3AA01277DEE8"), InterfaceType(ComInterfaceType.InterfaceIsIUnknown)]
interface IAudioSessionEnumerator {
  int GetCount(out int SessionCount);
  int GetSession(int SessionCount, out IAudioSessionControl Session);
}

[Guid("BFB7FF88-7239-4FC9-8FA2-07C950BE9C6D"), InterfaceType(ComInterfaceType.InterfaceIsIUnknown)]
interface IAudioSessionControl2 {
  int NotImpl0();
  int NotImpl1();
  int GetDisplayName([MarshalAs(UnmanagedType.LPWStr)] out string pRetVal);
  int SetDisplayName([MarshalAs(UnmanagedType.LPWStr)] string Value, Guid EventContext);
  int GetIconPath([MarshalAs(UnmanagedType.LPWStr)] out string pRetVal);
  int SetIconPath([MarshalAs(UnmanagedType.LPWStr)] string Value, Guid EventContext);
  int GetGroupingParam(out Guid pRetVal);
  int SetGroupingParam(Guid Override, Guid EventContext);
  int NotImpl2();
  int NotImpl3();
  int GetSessionIdentifier([MarshalAs(UnmanagedType.LPWStr)] out string pRetVal);
  int GetSessionInstanceIdentifier([MarshalAs(UnmanagedType.LPWStr)] out string pRetVal);
  int GetProcessId(out uint pRetVal);
  int IsSystemSoundsSession();
  int SetDuckingPreference(bool optOut);
}

[Guid("87CE5498-68D6-44E5-9215-6DA47EF883D8"), InterfaceType(ComInterfaceType.InterfaceIsIUnknown)]
interface ISimpleAudioVolume {
  int SetMasterVolume(float fLevel, ref Guid EventContext);
  int GetMasterVolume(out float pfLevel);
  int SetMute(bool bMute, ref Guid EventContext);
  int GetMute(out bool pbMute);
}

[ComImport, Guid("BCDE0395-E52F-467C-8E3D-C4579291692E")]
class MMDeviceEnumeratorComObject {
}
"@

$targetToken = $Target.Trim().Trim('"').ToLower()
if ([string]::IsNullOrWhiteSpace($targetToken)) { throw "empty target" }

$step = [Math]::Max(-1.0, [Math]::Min(1.0, $Step))
$deviceEnumerator = [IMMDeviceEnumerator](New-Object MMDeviceEnumeratorComObject)
$device = $null
[void]$deviceEnumerator.GetDefaultAudioEndpoint([EDataFlow]::eRender, [ERole]::eMultimedia, [ref]$device)

$iid = [Guid]::Parse("77AA99A0-1BD6-484F-8BC7-2C654C9A9B6F")
$managerObj = $null
[void]$device.Activate([ref]$iid, 23, [IntPtr]::Zero, [ref]$managerObj)
$manager = [IAudioSessionManager2]$managerObj

$sessions = $null
[void]$manager.GetSessionEnumerator([ref]$sessions)
$count = 0
[void]$sessions.GetCount([ref]$count)

$changed = 0
$lastPercent = -1
for ($i = 0; $i -lt $count; $i++) {
  $control = $null
  [void]$sessions.GetSession($i, [ref]$control)
  if ($null -eq $control) { continue }

  $control2 = [IAudioSessionControl2]$control
  $procId = 0
  [void]$control2.GetProcessId([ref]$procId)
  if ($procId -le 0) { continue }

  $procName = ''
  try {
    $procName = [System.Diagnostics.Process]::GetProcessById([int]$procId).ProcessName.ToLower()
  } catch {
    continue
  }

  if ($procName -ne $targetToken -and -not $procName.Contains($targetToken) -and -not $targetToken.Contains($procName)) {
    continue
  }

  $volume = [ISimpleAudioVolume]$control
  $current = 0.0
  [void]$volume.GetMasterVolume([ref]$current)
  $next = [Math]::Max(0.0, [Math]::Min(1.0, $current + $step))
  $ctx = [Guid]::Empty
  [void]$volume.SetMasterVolume([float]$next, [ref]$ctx)
  $changed += 1
  $lastPercent = [int][Math]::Round($next * 100.0)
}

if ($changed -eq 0) {
  [Console]::Out.WriteLine('{"ok":false,"reason":"No matching application is playing audio."}')
} else {
  [Console]::Out.WriteLine('{"ok":true,"sessions":' + $changed + ',"volume":' + $lastPercent + '}')
}
"##;
